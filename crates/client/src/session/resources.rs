//! Typed resource surface: the authenticated endpoints the platform UI
//! drives, all routed through the session-managed request path.
//!
//! List endpoints are inconsistent upstream (some answer with a pagination
//! envelope, some with a bare array), so everything funnels through
//! [`ListEnvelope`] and comes out as a plain `Vec`.

use campus_core::ListEnvelope;
use reqwest::Method;

use crate::error::ClientError;
use crate::session::SessionManager;
use crate::types::{Course, CourseFields, EnrollmentRequest, Student};

impl SessionManager {
    /// List students visible to the caller.
    pub async fn list_students(&self) -> Result<Vec<Student>, ClientError> {
        let envelope: ListEnvelope<Student> = self
            .send_authenticated(|client| client.request(Method::GET, "/students/"))
            .await?;
        Ok(envelope.into_items())
    }

    pub async fn get_student(&self, id: i64) -> Result<Student, ClientError> {
        self.send_authenticated(move |client| {
            client.request(Method::GET, &format!("/students/{id}/"))
        })
        .await
    }

    /// List courses visible to the caller.
    pub async fn list_courses(&self) -> Result<Vec<Course>, ClientError> {
        let envelope: ListEnvelope<Course> = self
            .send_authenticated(|client| client.request(Method::GET, "/courses/"))
            .await?;
        Ok(envelope.into_items())
    }

    pub async fn get_course(&self, id: i64) -> Result<Course, ClientError> {
        self.send_authenticated(move |client| {
            client.request(Method::GET, &format!("/courses/{id}/"))
        })
        .await
    }

    pub async fn create_course(&self, course: CourseFields) -> Result<Course, ClientError> {
        self.send_authenticated(move |client| {
            client.request(Method::POST, "/courses/").json(&course)
        })
        .await
    }

    pub async fn update_course(
        &self,
        id: i64,
        fields: CourseFields,
    ) -> Result<Course, ClientError> {
        self.send_authenticated(move |client| {
            client
                .request(Method::PATCH, &format!("/courses/{id}/"))
                .json(&fields)
        })
        .await
    }

    pub async fn delete_course(&self, id: i64) -> Result<(), ClientError> {
        self.send_authenticated_empty(move |client| {
            client.request(Method::DELETE, &format!("/courses/{id}/"))
        })
        .await
    }

    /// Enroll a student in a course.
    pub async fn enroll_student(
        &self,
        course_id: i64,
        student_id: i64,
    ) -> Result<(), ClientError> {
        self.send_authenticated_empty(move |client| {
            client
                .request(Method::POST, &format!("/courses/{course_id}/enroll/"))
                .json(&EnrollmentRequest { student_id })
        })
        .await
    }

    /// Drop a student from a course.
    pub async fn drop_student(
        &self,
        course_id: i64,
        student_id: i64,
    ) -> Result<(), ClientError> {
        self.send_authenticated_empty(move |client| {
            client
                .request(Method::POST, &format!("/courses/{course_id}/drop/"))
                .json(&EnrollmentRequest { student_id })
        })
        .await
    }
}
