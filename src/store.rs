/*!
The record store.

The database engine proper is an external collaborator; this module is
the document collection the rest of the crate talks to, exposing exactly
the create/find/update/delete/aggregate operations the service needs.
Records live in a map behind a `tokio::sync::RwLock`; every write holds
the lock for its whole critical section, so the store's own uniqueness
constraints catch anything that slips past the registration endpoint's
pre-check.
*/
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::student::{Student, StudentOut};

/// Which uniqueness constraint a write collided with. Roll number is
/// always checked (and reported) before email.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ConflictField {
    RollNo,
    Email,
}

impl std::fmt::Display for ConflictField {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let token = match self {
            ConflictField::RollNo => "roll number",
            ConflictField::Email  => "email",
        };

        write!(f, "{}", token)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StoreError {
    /// A uniqueness constraint (roll number or email) was violated.
    Conflict(ConflictField),
    /// The identifier or roll number resolves to no record.
    NotFound,
    /// Anything unexpected. The detail is for the log, not the caller.
    Internal(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            StoreError::Conflict(field) => write!(f, "{} already exists", field),
            StoreError::NotFound => write!(f, "Student not found"),
            StoreError::Internal(s) => write!(f, "internal store error: {}", s),
        }
    }
}

/// One `{_id, count}` bucket of a grouped aggregate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BucketCount {
    #[serde(rename = "_id")]
    pub id: String,
    pub count: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total_students: u64,
    /// Registrations within the last seven days, inclusive.
    pub recent_registrations: u64,
    pub course_stats: Vec<BucketCount>,
    pub department_stats: Vec<BucketCount>,
}

/// Count occurrences of each key and return buckets sorted by count
/// descending (key ascending on ties, so output order is stable).
fn group_counts<I>(keys: I) -> Vec<BucketCount>
where
    I: IntoIterator<Item = String>,
{
    let mut counts: HashMap<String, u64> = HashMap::new();
    for k in keys {
        *counts.entry(k).or_insert(0) += 1;
    }

    let mut buckets: Vec<BucketCount> = counts.into_iter()
        .map(|(id, count)| BucketCount { id, count })
        .collect();
    buckets.sort_by(|a, b| b.count.cmp(&a.count).then(a.id.cmp(&b.id)));
    buckets
}

#[derive(Debug, Default)]
pub struct Store {
    records: RwLock<HashMap<Uuid, Student>>,
}

impl Store {
    pub fn new() -> Self {
        log::trace!("Store::new() called.");
        Self::default()
    }

    /// Check both uniqueness constraints without writing. The caller may
    /// still lose a race; `insert()` repeats the check under the write
    /// lock and reports the same kind of conflict.
    pub async fn find_conflict(
        &self,
        roll_no: &str,
        email: &str,
    ) -> Option<ConflictField> {
        log::trace!(
            "Store::find_conflict( {:?}, {:?} ) called.", roll_no, email
        );

        let email = email.trim().to_lowercase();
        let records = self.records.read().await;
        if records.values().any(|s| s.roll_no == roll_no) {
            return Some(ConflictField::RollNo);
        }
        if records.values().any(|s| s.email == email) {
            return Some(ConflictField::Email);
        }
        None
    }

    /// Insert a new record. A single atomic write: the uniqueness checks
    /// and the insertion happen under one write lock.
    pub async fn insert(&self, student: Student) -> Result<(), StoreError> {
        log::trace!("Store::insert( {:?} ) called.", &student.roll_no);

        let mut records = self.records.write().await;
        if records.values().any(|s| s.roll_no == student.roll_no) {
            return Err(StoreError::Conflict(ConflictField::RollNo));
        }
        if records.values().any(|s| s.email == student.email) {
            return Err(StoreError::Conflict(ConflictField::Email));
        }
        if records.insert(student.id, student).is_some() {
            // v4 identifiers shouldn't collide; treat it as corruption.
            return Err(StoreError::Internal(
                "record identifier already present".to_owned()
            ));
        }
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Student, StoreError> {
        log::trace!("Store::get( {} ) called.", &id);

        self.records.read().await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    pub async fn get_by_roll(&self, roll_no: &str) -> Result<Student, StoreError> {
        log::trace!("Store::get_by_roll( {:?} ) called.", roll_no);

        self.records.read().await
            .values()
            .find(|s| s.roll_no == roll_no)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    /// All records, most recently registered first. Ties break on roll
    /// number so the order is deterministic.
    pub async fn all_sorted(&self) -> Vec<StudentOut> {
        log::trace!("Store::all_sorted() called.");

        let records = self.records.read().await;
        let mut all: Vec<&Student> = records.values().collect();
        all.sort_by(|a, b| {
            b.registration_date.cmp(&a.registration_date)
                .then_with(|| a.roll_no.cmp(&b.roll_no))
        });
        all.into_iter().map(StudentOut::from).collect()
    }

    pub async fn count(&self) -> u64 {
        self.records.read().await.len() as u64
    }

    /// One page of the registration-date-descending order. `page` counts
    /// from 1; `limit` must be at least 1. Returns the slice, the total
    /// record count, and the page count (ceiling of total/limit).
    pub async fn page(
        &self,
        page: u64,
        limit: u64,
    ) -> (Vec<StudentOut>, u64, u64) {
        log::trace!("Store::page( {}, {} ) called.", &page, &limit);

        let page = page.max(1);
        let limit = limit.max(1);

        let all = self.all_sorted().await;
        let total = all.len() as u64;
        let pages = (total + limit - 1) / limit;
        let skip = ((page - 1) * limit) as usize;

        let slice: Vec<StudentOut> = all.into_iter()
            .skip(skip)
            .take(limit as usize)
            .collect();
        (slice, total, pages)
    }

    /**
    Overwrite an existing record with an already-updated copy.

    Fails with `NotFound` if the identifier is gone, and with the usual
    conflict kinds if the new roll number or email now collides with some
    *other* record. Like `insert()`, the check and the write share one
    write lock.
    */
    pub async fn replace(&self, student: Student) -> Result<(), StoreError> {
        log::trace!("Store::replace( {} ) called.", &student.id);

        let mut records = self.records.write().await;
        if !records.contains_key(&student.id) {
            return Err(StoreError::NotFound);
        }
        if records.values()
            .any(|s| s.id != student.id && s.roll_no == student.roll_no)
        {
            return Err(StoreError::Conflict(ConflictField::RollNo));
        }
        if records.values()
            .any(|s| s.id != student.id && s.email == student.email)
        {
            return Err(StoreError::Conflict(ConflictField::Email));
        }
        records.insert(student.id, student);
        Ok(())
    }

    /// Hard delete. No tombstone; a subsequent `get()` is `NotFound`.
    pub async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        log::trace!("Store::delete( {} ) called.", &id);

        match self.records.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound),
        }
    }

    /**
    Aggregate summary for the dashboard.

    `now` is passed in rather than read from the clock so the recency
    window is testable. The department counts unwind the `departments`
    array first: a record with N departments feeds N buckets.
    */
    pub async fn stats(&self, now: OffsetDateTime) -> StatsSummary {
        log::trace!("Store::stats( {} ) called.", &now);

        let records = self.records.read().await;
        let total_students = records.len() as u64;

        let cutoff = now - Duration::days(7);
        let recent_registrations = records.values()
            .filter(|s| s.registration_date >= cutoff)
            .count() as u64;

        let course_stats = group_counts(
            records.values().map(|s| s.course.clone())
        );

        // Flatten, then group.
        let all_departments: Vec<String> = records.values()
            .flat_map(|s| s.departments.iter().cloned())
            .collect();
        let department_stats = group_counts(all_departments);

        StatsSummary {
            total_students,
            recent_registrations,
            course_stats,
            department_stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::student::tests::candidate;
    use crate::tests::ensure_logging;

    use time::macros::datetime;

    const T0: OffsetDateTime = datetime!(2026-06-01 12:00 UTC);

    fn stored(roll: &str, email: &str, at: OffsetDateTime) -> Student {
        Student::create(candidate(roll, email), at)
    }

    #[tokio::test]
    async fn roll_conflict_reported_before_email() {
        ensure_logging();

        let db = Store::new();
        db.insert(stored("R1", "a@x.com", T0)).await.unwrap();

        // Both fields collide; roll number wins.
        assert_eq!(
            db.find_conflict("R1", "a@x.com").await,
            Some(ConflictField::RollNo)
        );
        assert_eq!(
            db.find_conflict("R2", "A@X.COM").await,
            Some(ConflictField::Email)
        );
        assert_eq!(db.find_conflict("R2", "b@x.com").await, None);

        // The same kinds surface from the write itself (the race path).
        let err = db.insert(stored("R1", "c@x.com", T0)).await.unwrap_err();
        assert_eq!(err, StoreError::Conflict(ConflictField::RollNo));
        let err = db.insert(stored("R3", "a@x.com", T0)).await.unwrap_err();
        assert_eq!(err, StoreError::Conflict(ConflictField::Email));
    }

    #[tokio::test]
    async fn list_is_recency_descending() {
        ensure_logging();

        let db = Store::new();
        db.insert(stored("R1", "a@x.com", T0)).await.unwrap();
        db.insert(stored("R2", "b@x.com", T0 + Duration::days(2))).await.unwrap();
        db.insert(stored("R3", "c@x.com", T0 + Duration::days(1))).await.unwrap();

        let rolls: Vec<String> = db.all_sorted().await
            .into_iter()
            .map(|s| s.roll_no)
            .collect();
        assert_eq!(rolls, vec!["R2", "R3", "R1"]);
    }

    #[tokio::test]
    async fn pagination_slices_and_counts() {
        ensure_logging();

        let db = Store::new();
        for n in 0..25 {
            let s = stored(
                &format!("R{:02}", n),
                &format!("s{}@x.com", n),
                T0 + Duration::minutes(n),
            );
            db.insert(s).await.unwrap();
        }

        let (slice, total, pages) = db.page(3, 10).await;
        assert_eq!(slice.len(), 5);
        assert_eq!(total, 25);
        assert_eq!(pages, 3);

        // Page numbers below 1 clamp to the first page.
        let (slice, _, _) = db.page(0, 10).await;
        assert_eq!(slice.len(), 10);
        assert_eq!(slice[0].roll_no, "R24");

        let (slice, total, pages) = db.page(9, 10).await;
        assert!(slice.is_empty());
        assert_eq!(total, 25);
        assert_eq!(pages, 3);
    }

    #[tokio::test]
    async fn course_buckets_sorted_descending() {
        ensure_logging();

        let db = Store::new();
        let mut a1 = candidate("R1", "a@x.com");
        a1.course = "A".to_owned();
        let mut a2 = candidate("R2", "b@x.com");
        a2.course = "A".to_owned();
        let mut b1 = candidate("R3", "c@x.com");
        b1.course = "B".to_owned();
        for c in [a1, a2, b1] {
            db.insert(Student::create(c, T0)).await.unwrap();
        }

        let summary = db.stats(T0).await;
        assert_eq!(summary.course_stats, vec![
            BucketCount { id: "A".to_owned(), count: 2 },
            BucketCount { id: "B".to_owned(), count: 1 },
        ]);
    }

    #[tokio::test]
    async fn departments_unwound_before_grouping() {
        ensure_logging();

        let db = Store::new();
        let mut c1 = candidate("R1", "a@x.com");
        c1.departments = vec!["CSE".to_owned(), "IT".to_owned()];
        let mut c2 = candidate("R2", "b@x.com");
        c2.departments = vec!["CSE".to_owned()];
        let mut c3 = candidate("R3", "c@x.com");
        c3.departments = vec![];
        for c in [c1, c2, c3] {
            db.insert(Student::create(c, T0)).await.unwrap();
        }

        let summary = db.stats(T0).await;
        assert_eq!(summary.department_stats, vec![
            BucketCount { id: "CSE".to_owned(), count: 2 },
            BucketCount { id: "IT".to_owned(), count: 1 },
        ]);
    }

    #[tokio::test]
    async fn recency_window_is_seven_days_inclusive() {
        ensure_logging();

        let now = T0 + Duration::days(30);
        let db = Store::new();
        db.insert(stored("R1", "a@x.com", now - Duration::days(8))).await.unwrap();
        db.insert(stored("R2", "b@x.com", now - Duration::days(7))).await.unwrap();
        db.insert(stored("R3", "c@x.com", now - Duration::days(1))).await.unwrap();

        let summary = db.stats(now).await;
        assert_eq!(summary.total_students, 3);
        assert_eq!(summary.recent_registrations, 2);
    }

    #[tokio::test]
    async fn replace_checks_other_records_only() {
        ensure_logging();

        let db = Store::new();
        let s1 = stored("R1", "a@x.com", T0);
        let s2 = stored("R2", "b@x.com", T0);
        let id1 = s1.id;
        db.insert(s1).await.unwrap();
        db.insert(s2).await.unwrap();

        // Keeping your own roll number is not a conflict.
        let mut upd = db.get(id1).await.unwrap();
        upd.city = "Khulna".to_owned();
        db.replace(upd).await.unwrap();
        assert_eq!(db.get(id1).await.unwrap().city, "Khulna");

        // Taking someone else's is.
        let mut upd = db.get(id1).await.unwrap();
        upd.roll_no = "R2".to_owned();
        let err = db.replace(upd).await.unwrap_err();
        assert_eq!(err, StoreError::Conflict(ConflictField::RollNo));
    }

    #[tokio::test]
    async fn delete_is_hard() {
        ensure_logging();

        let db = Store::new();
        let s = stored("R1", "a@x.com", T0);
        let id = s.id;
        db.insert(s).await.unwrap();

        db.delete(id).await.unwrap();
        assert_eq!(db.get(id).await.unwrap_err(), StoreError::NotFound);
        assert_eq!(db.delete(id).await.unwrap_err(), StoreError::NotFound);
        assert_eq!(
            db.get_by_roll("R1").await.unwrap_err(),
            StoreError::NotFound
        );
    }
}
