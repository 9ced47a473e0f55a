/*!
Client-side state for the multi-step registration form.

A flat draft record plus a keyed academic sub-state: an ordered list of
selected exam types and a map from exam type to its entry fields. Each
entry carries an explicit `mandatory` flag; the mandatory exam is seeded
at initialization and refuses removal. On submit the draft runs the full
pre-submit validation layer, and a positive response from the injected
`ApiClient` resets everything to the initial configuration.
*/
use std::collections::HashMap;

use time::{Date, Month};
use uuid::Uuid;

use crate::store::StatsSummary;
use crate::student::{
    AcademicQualification, ExamType, Gender, RegisterStudent, StudentOut,
};
use crate::validate::{email_ok, mobile_ok, passing_year_ok, MIN_YEAR};

/// The flat draft fields, in the order they appear on the form. This
/// order decides which failing field the view scrolls to first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    RollNo,
    FirstName,
    LastName,
    FathersName,
    MothersName,
    DobDay,
    DobMonth,
    DobYear,
    Mobile,
    Email,
    Password,
    Gender,
    Course,
    City,
    Address,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QualField {
    InstituteName,
    GroupSubject,
    BoardUniversity,
    PassingYear,
    Gpa,
}

/// Identifies one input on the form, flat or per-exam.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKey {
    Flat(Field),
    Exam(ExamType, QualField),
}

/// One academic-qualification entry as held by the form, fields still
/// raw strings. The `mandatory` flag is set from the vocabulary when the
/// entry is created; removal consults the flag, not the exam key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntryState {
    pub institute_name: String,
    pub group_subject: String,
    pub board_university: String,
    pub passing_year: String,
    pub gpa: String,
    pub mandatory: bool,
}

impl EntryState {
    fn blank(exam: ExamType) -> Self {
        EntryState {
            mandatory: exam.mandatory(),
            ..Self::default()
        }
    }
}

/// The registration endpoint's answer to a successful submit.
#[derive(Clone, Debug, PartialEq)]
pub struct Registered {
    pub id: Uuid,
    pub roll_no: String,
    pub name: String,
    pub registration_date: String,
}

/**
The seam between the client-side state and the backend.

The production implementation talks HTTP to an `Endpoint`; tests inject
doubles. Errors are user-facing message strings.
*/
pub trait ApiClient {
    fn register(&mut self, payload: &RegisterStudent) -> Result<Registered, String>;
    fn get(&mut self, id: Uuid) -> Result<StudentOut, String>;
    fn list(&mut self) -> Result<Vec<StudentOut>, String>;
    fn delete(&mut self, id: Uuid) -> Result<(), String>;
    fn stats(&mut self) -> Result<StatsSummary, String>;
}

/// Where the backend lives. Replaces literal URLs baked into the client.
#[derive(Clone, Debug)]
pub struct Endpoint {
    base: String,
}

impl Endpoint {
    pub fn new(base: &str) -> Self {
        Self { base: base.trim_end_matches('/').to_owned() }
    }

    pub fn register_url(&self) -> String {
        format!("{}/students/register", &self.base)
    }

    pub fn students_url(&self) -> String {
        format!("{}/students", &self.base)
    }

    pub fn student_url(&self, id: Uuid) -> String {
        format!("{}/students/{}", &self.base, id)
    }

    pub fn stats_url(&self) -> String {
        format!("{}/students/stats/summary", &self.base)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SubmitError {
    /// The draft failed pre-submit validation. Per-field messages are
    /// recorded on the form; this carries the first failing field, the
    /// one the view should scroll to.
    Invalid(FieldKey),
    /// The backend refused or the transport failed. The draft is left
    /// intact so the user can correct and resubmit.
    Api(String),
}

#[derive(Debug)]
pub struct Form {
    pub roll_no: String,
    pub first_name: String,
    pub last_name: String,
    pub fathers_name: String,
    pub mothers_name: String,
    pub dob_day: String,
    pub dob_month: String,
    pub dob_year: String,
    pub mobile: String,
    pub email: String,
    pub password: String,
    pub gender: Option<Gender>,
    pub departments: Vec<String>,
    pub course: String,
    pub city: String,
    pub address: String,
    /// Placeholder; never validated or submitted.
    pub student_photo: Option<String>,
    selected: Vec<ExamType>,
    entries: HashMap<ExamType, EntryState>,
    errors: Vec<(FieldKey, String)>,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    pub fn new() -> Self {
        let mandatory = ExamType::Ssc;
        let mut entries = HashMap::new();
        entries.insert(mandatory, EntryState::blank(mandatory));

        Form {
            roll_no: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            fathers_name: String::new(),
            mothers_name: String::new(),
            dob_day: String::new(),
            dob_month: String::new(),
            dob_year: String::new(),
            mobile: String::new(),
            email: String::new(),
            password: String::new(),
            gender: None,
            departments: Vec::new(),
            course: String::new(),
            city: String::new(),
            address: String::new(),
            student_photo: None,
            selected: vec![mandatory],
            entries,
            errors: Vec::new(),
        }
    }

    pub fn selected_exams(&self) -> &[ExamType] {
        &self.selected
    }

    pub fn entry(&self, exam: ExamType) -> Option<&EntryState> {
        self.entries.get(&exam)
    }

    /// Exam types still offered by the "add" dropdown: the vocabulary
    /// minus whatever is already selected.
    pub fn available_exams(&self) -> Vec<ExamType> {
        ExamType::ALL.iter()
            .copied()
            .filter(|t| !self.selected.contains(t))
            .collect()
    }

    pub fn errors(&self) -> &[(FieldKey, String)] {
        &self.errors
    }

    pub fn error_for(&self, key: FieldKey) -> Option<&str> {
        self.errors.iter()
            .find(|(k, _)| *k == key)
            .map(|(_, msg)| msg.as_str())
    }

    fn clear_error(&mut self, key: FieldKey) {
        self.errors.retain(|(k, _)| *k != key);
    }

    /// Set one flat field. Any recorded error for that field clears as
    /// soon as it is edited.
    pub fn set_field(&mut self, field: Field, value: &str) {
        log::trace!("Form::set_field( {:?}, {:?} ) called.", &field, value);

        let slot = match field {
            Field::RollNo      => &mut self.roll_no,
            Field::FirstName   => &mut self.first_name,
            Field::LastName    => &mut self.last_name,
            Field::FathersName => &mut self.fathers_name,
            Field::MothersName => &mut self.mothers_name,
            Field::DobDay      => &mut self.dob_day,
            Field::DobMonth    => &mut self.dob_month,
            Field::DobYear     => &mut self.dob_year,
            Field::Mobile      => &mut self.mobile,
            Field::Email       => &mut self.email,
            Field::Password    => &mut self.password,
            Field::Course      => &mut self.course,
            Field::City        => &mut self.city,
            Field::Address     => &mut self.address,
            Field::Gender => {
                log::warn!("Gender is set through set_gender(); ignoring.");
                return;
            },
        };
        *slot = value.to_owned();
        self.clear_error(FieldKey::Flat(field));
    }

    pub fn set_gender(&mut self, gender: Gender) {
        self.gender = Some(gender);
        self.clear_error(FieldKey::Flat(Field::Gender));
    }

    /// Checkbox semantics: present becomes absent and vice versa.
    pub fn toggle_department(&mut self, dept: &str) {
        match self.departments.iter().position(|d| d == dept) {
            Some(n) => { self.departments.remove(n); },
            None => { self.departments.push(dept.to_owned()); },
        }
    }

    /// Select an additional exam type. Re-adding an already-selected
    /// type is a no-op.
    pub fn add_exam(&mut self, exam: ExamType) {
        log::trace!("Form::add_exam( {:?} ) called.", &exam);

        if self.selected.contains(&exam) {
            return;
        }
        self.selected.push(exam);
        self.entries.insert(exam, EntryState::blank(exam));
    }

    /// Deselect an exam type. A mandatory entry refuses with the notice
    /// the view shows the user; this is never a silent no-op.
    pub fn remove_exam(&mut self, exam: ExamType) -> Result<(), String> {
        log::trace!("Form::remove_exam( {:?} ) called.", &exam);

        if let Some(entry) = self.entries.get(&exam) {
            if entry.mandatory {
                return Err(format!(
                    "{} is mandatory and cannot be removed.", exam.label()
                ));
            }
        }
        self.selected.retain(|t| *t != exam);
        self.entries.remove(&exam);
        self.errors.retain(|(k, _)| !matches!(k, FieldKey::Exam(t, _) if *t == exam));
        Ok(())
    }

    /// Set one field of one selected exam's entry. Quietly does nothing
    /// if the exam isn't selected.
    pub fn set_exam_field(&mut self, exam: ExamType, field: QualField, value: &str) {
        log::trace!(
            "Form::set_exam_field( {:?}, {:?}, {:?} ) called.",
            &exam, &field, value
        );

        let entry = match self.entries.get_mut(&exam) {
            Some(e) => e,
            None => { return; },
        };
        let slot = match field {
            QualField::InstituteName   => &mut entry.institute_name,
            QualField::GroupSubject    => &mut entry.group_subject,
            QualField::BoardUniversity => &mut entry.board_university,
            QualField::PassingYear     => &mut entry.passing_year,
            QualField::Gpa             => &mut entry.gpa,
        };
        *slot = value.to_owned();
        self.clear_error(FieldKey::Exam(exam, field));
    }

    /**
    The client-side pre-submit validation layer.

    Returns per-field messages in form order; empty means the draft may
    be submitted. This layer is stricter than the server's: it also
    checks formats (DOB ranges, mobile, email shape, password length)
    and every field of each mandatory entry. The server still re-checks
    its own rules; it never trusts this one.
    */
    pub fn validate(&self, current_year: i32) -> Vec<(FieldKey, String)> {
        use Field::*;

        let mut errs: Vec<(FieldKey, String)> = Vec::new();
        let push_flat = |errs: &mut Vec<(FieldKey, String)>, f: Field, msg: &str| {
            errs.push((FieldKey::Flat(f), msg.to_owned()));
        };

        if self.roll_no.trim().is_empty() {
            push_flat(&mut errs, RollNo, "Roll number is required");
        }
        if self.first_name.trim().is_empty() {
            push_flat(&mut errs, FirstName, "First name is required");
        }
        if self.last_name.trim().is_empty() {
            push_flat(&mut errs, LastName, "Last name is required");
        }
        if self.fathers_name.trim().is_empty() {
            push_flat(&mut errs, FathersName, "Father's name is required");
        }
        if self.mothers_name.trim().is_empty() {
            push_flat(&mut errs, MothersName, "Mother's name is required");
        }

        if self.dob_day.trim().is_empty()
            || self.dob_month.trim().is_empty()
            || self.dob_year.trim().is_empty()
        {
            push_flat(&mut errs, DobDay, "Date of birth is required");
        } else {
            match self.dob_day.trim().parse::<u8>() {
                Ok(d) if (1..=31).contains(&d) => {},
                _ => { push_flat(&mut errs, DobDay, "Invalid day"); },
            }
            match self.dob_month.trim().parse::<u8>() {
                Ok(m) if (1..=12).contains(&m) => {},
                _ => { push_flat(&mut errs, DobMonth, "Invalid month"); },
            }
            match self.dob_year.trim().parse::<i32>() {
                Ok(y) if y >= MIN_YEAR && y <= current_year => {},
                _ => { push_flat(&mut errs, DobYear, "Invalid year"); },
            }
        }

        if self.mobile.trim().is_empty() {
            push_flat(&mut errs, Mobile, "Mobile number is required");
        } else if !mobile_ok(&self.mobile) {
            push_flat(&mut errs, Mobile, "Mobile must be 10 digits");
        }

        if self.email.trim().is_empty() {
            push_flat(&mut errs, Email, "Email is required");
        } else if !email_ok(&self.email) {
            push_flat(&mut errs, Email, "Invalid email format");
        }

        if self.password.is_empty() {
            push_flat(&mut errs, Password, "Password is required");
        } else if self.password.chars().count() < 8 {
            // Counted in characters, not bytes.
            push_flat(&mut errs, Password, "Password must be at least 8 characters");
        }

        if self.gender.is_none() {
            push_flat(&mut errs, Gender, "Gender is required");
        }
        if self.course.is_empty() {
            push_flat(&mut errs, Course, "Course is required");
        }
        if self.city.trim().is_empty() {
            push_flat(&mut errs, City, "City is required");
        }
        if self.address.trim().is_empty() {
            push_flat(&mut errs, Address, "Address is required");
        }

        for exam in &self.selected {
            let entry = match self.entries.get(exam) {
                Some(e) => e,
                None => continue,
            };
            if !entry.mandatory {
                continue;
            }
            let label = exam.label();
            if entry.institute_name.trim().is_empty() {
                errs.push((
                    FieldKey::Exam(*exam, QualField::InstituteName),
                    format!("Institute name is required for {}", label),
                ));
            }
            if entry.group_subject.trim().is_empty() {
                errs.push((
                    FieldKey::Exam(*exam, QualField::GroupSubject),
                    format!("Group/Subject is required for {}", label),
                ));
            }
            if entry.board_university.trim().is_empty() {
                errs.push((
                    FieldKey::Exam(*exam, QualField::BoardUniversity),
                    format!("Board/University is required for {}", label),
                ));
            }
            if entry.passing_year.trim().is_empty() {
                errs.push((
                    FieldKey::Exam(*exam, QualField::PassingYear),
                    format!("Passing year is required for {}", label),
                ));
            } else if !passing_year_ok(entry.passing_year.trim(), current_year) {
                errs.push((
                    FieldKey::Exam(*exam, QualField::PassingYear),
                    "Passing year must be 4 digits (YYYY) and a real year".to_owned(),
                ));
            }
            if entry.gpa.trim().is_empty() {
                errs.push((
                    FieldKey::Exam(*exam, QualField::Gpa),
                    format!("GPA is required for {}", label),
                ));
            }
        }

        errs
    }

    /// Assemble the wire payload: flat fields plus the qualifications in
    /// selection order. Expects a draft that passed `validate()`; a date
    /// that still won't assemble (Feb 31st) is reported against the day
    /// field.
    fn build_payload(&self) -> Result<RegisterStudent, (FieldKey, String)> {
        let day_err = || (
            FieldKey::Flat(Field::DobDay),
            "Invalid day".to_owned(),
        );

        let day: u8 = self.dob_day.trim().parse().map_err(|_| day_err())?;
        let month_num: u8 = self.dob_month.trim().parse()
            .map_err(|_| day_err())?;
        let month = Month::try_from(month_num).map_err(|_| day_err())?;
        let year: i32 = self.dob_year.trim().parse().map_err(|_| day_err())?;
        let date_of_birth = Date::from_calendar_date(year, month, day)
            .map_err(|_| day_err())?;

        let gender = self.gender.ok_or((
            FieldKey::Flat(Field::Gender),
            "Gender is required".to_owned(),
        ))?;

        let mut academic_qualifications = Vec::with_capacity(self.selected.len());
        for exam in &self.selected {
            let entry = match self.entries.get(exam) {
                Some(e) => e,
                None => continue,
            };
            let passing_year: i32 = entry.passing_year.trim().parse()
                .unwrap_or(0);
            academic_qualifications.push(AcademicQualification {
                exam_type: exam.label().to_owned(),
                institute_name: entry.institute_name.clone(),
                group_subject: entry.group_subject.clone(),
                board_university: entry.board_university.clone(),
                passing_year,
                gpa: entry.gpa.clone(),
            });
        }

        Ok(RegisterStudent {
            roll_no: self.roll_no.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            fathers_name: self.fathers_name.clone(),
            mothers_name: self.mothers_name.clone(),
            date_of_birth,
            mobile: self.mobile.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
            gender,
            departments: self.departments.clone(),
            course: self.course.clone(),
            city: self.city.clone(),
            address: self.address.clone(),
            academic_qualifications,
        })
    }

    /**
    Validate and, if clean, send the draft through `client`.

    On validation failure the per-field messages are recorded on the form
    and the first failing field comes back in the error (the view scrolls
    there). On a positive response the whole draft resets to its initial
    configuration, mandatory exam re-seeded blank.
    */
    pub fn submit(
        &mut self,
        client: &mut dyn ApiClient,
        current_year: i32,
    ) -> Result<Registered, SubmitError> {
        log::trace!("Form::submit( [client], {} ) called.", &current_year);

        let errs = self.validate(current_year);
        if !errs.is_empty() {
            let first = errs[0].0;
            self.errors = errs;
            return Err(SubmitError::Invalid(first));
        }

        let payload = match self.build_payload() {
            Ok(p) => p,
            Err((key, msg)) => {
                self.errors = vec![(key, msg)];
                return Err(SubmitError::Invalid(key));
            },
        };

        match client.register(&payload) {
            Ok(registered) => {
                log::info!("Registration accepted: {}", &registered.roll_no);
                *self = Form::new();
                Ok(registered)
            },
            Err(msg) => {
                log::error!("Registration failed: {}", &msg);
                Err(SubmitError::Api(msg))
            },
        }
    }
}
