/*!
Headless view models for the dashboard pages: the cached record list
with its stats summary, and the single-student detail view. Both go
through the same `ApiClient` seam the form uses.
*/
use time::Date;
use uuid::Uuid;

use crate::form::ApiClient;
use crate::store::StatsSummary;
use crate::student::StudentOut;

#[derive(Debug, Default)]
pub struct Dashboard {
    students: Vec<StudentOut>,
    stats: Option<StatsSummary>,
    /// Last user-facing failure, if any. Cleared by a clean refresh.
    error: Option<String>,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn students(&self) -> &[StudentOut] {
        &self.students
    }

    pub fn stats(&self) -> Option<&StatsSummary> {
        self.stats.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Reload both the record list and the stats summary. On failure the
    /// previous data stays on screen and the error is recorded.
    pub fn refresh(&mut self, client: &mut dyn ApiClient) {
        log::trace!("Dashboard::refresh() called.");

        match client.list() {
            Ok(students) => { self.students = students; },
            Err(msg) => {
                log::error!("Error fetching students: {}", &msg);
                self.error = Some(msg);
                return;
            },
        }

        match client.stats() {
            Ok(summary) => { self.stats = Some(summary); },
            Err(msg) => {
                log::error!("Error fetching statistics: {}", &msg);
                self.error = Some(msg);
                return;
            },
        }

        self.error = None;
    }

    /// Delete one record, then reload so the list and the stats agree.
    pub fn delete(&mut self, client: &mut dyn ApiClient, id: Uuid) {
        log::trace!("Dashboard::delete( {} ) called.", &id);

        match client.delete(id) {
            Ok(()) => { self.refresh(client); },
            Err(msg) => {
                log::error!("Error deleting student {}: {}", &id, &msg);
                self.error = Some(msg);
            },
        }
    }
}

/// Age in whole years on `today`, not yet counting a birthday that
/// hasn't come around this year.
pub fn age_on(date_of_birth: Date, today: Date) -> i32 {
    let mut age = today.year() - date_of_birth.year();
    let birthday_pending = (today.month() as u8, today.day())
        < (date_of_birth.month() as u8, date_of_birth.day());
    if birthday_pending {
        age -= 1;
    }
    age
}

/// View model for the single-student detail page.
#[derive(Debug, Default)]
pub struct StudentDetail {
    student: Option<StudentOut>,
    error: Option<String>,
}

impl StudentDetail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn student(&self) -> Option<&StudentOut> {
        self.student.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Fetch one record by identifier. On failure the page shows the
    /// recorded message instead of a record.
    pub fn load(&mut self, client: &mut dyn ApiClient, id: Uuid) {
        log::trace!("StudentDetail::load( {} ) called.", &id);

        match client.get(id) {
            Ok(student) => {
                self.student = Some(student);
                self.error = None;
            },
            Err(msg) => {
                log::error!("Error fetching student {}: {}", &id, &msg);
                self.student = None;
                self.error = Some(msg);
            },
        }
    }
}
