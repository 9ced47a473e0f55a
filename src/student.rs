/*!
The student record and its embedded types.

One `Student` per registration; `roll_no` and `email` are unique across
the collection. The `AcademicQualification` entries are embedded and have
no identity of their own.
*/
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Exam-type label of the one qualification every registration must carry.
pub const MANDATORY_EXAM_LABEL: &str = "S.S.C.";

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let token = match self {
            Gender::Male   => "male",
            Gender::Female => "female",
        };

        write!(f, "{}", token)
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male"   => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            _ => Err(format!("{:?} is not a valid Gender.", s)),
        }
    }
}

/**
The fixed vocabulary of exam types offered by the registration form.

Each type knows its display label (the string that travels on the wire as
`examType`) and whether it is mandatory. Exactly one type is mandatory;
the form seeds it at initialization and refuses to remove it.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExamType {
    Ssc,
    Hsc,
    DiplomaEngineering,
    DiplomaTextile,
    BscHons,
    Msc,
    Mca,
}

impl ExamType {
    pub const ALL: [ExamType; 7] = [
        ExamType::Ssc,
        ExamType::Hsc,
        ExamType::DiplomaEngineering,
        ExamType::DiplomaTextile,
        ExamType::BscHons,
        ExamType::Msc,
        ExamType::Mca,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ExamType::Ssc                => MANDATORY_EXAM_LABEL,
            ExamType::Hsc                => "H.S.C.",
            ExamType::DiplomaEngineering => "Diploma in Engineering",
            ExamType::DiplomaTextile     => "Diploma in Textile Engineering",
            ExamType::BscHons            => "B.Sc.(Hon's)",
            ExamType::Msc                => "M.Sc.",
            ExamType::Mca                => "MCA",
        }
    }

    pub fn mandatory(&self) -> bool {
        matches!(self, ExamType::Ssc)
    }
}

impl std::fmt::Display for ExamType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicQualification {
    pub exam_type: String,
    pub institute_name: String,
    pub group_subject: String,
    pub board_university: String,
    pub passing_year: i32,
    pub gpa: String,
}

/// A complete candidate record, as submitted by a client.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterStudent {
    #[serde(default)]
    pub roll_no: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub fathers_name: String,
    #[serde(default)]
    pub mothers_name: String,
    pub date_of_birth: Date,
    #[serde(default)]
    pub mobile: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub gender: Gender,
    #[serde(default)]
    pub departments: Vec<String>,
    #[serde(default)]
    pub course: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub academic_qualifications: Vec<AcademicQualification>,
}

/// A partial record for updates. The password and the registration date
/// are deliberately inexpressible here; an incoming `password` key is
/// dropped on deserialization.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStudent {
    pub roll_no: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub fathers_name: Option<String>,
    pub mothers_name: Option<String>,
    pub date_of_birth: Option<Date>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub gender: Option<Gender>,
    pub departments: Option<Vec<String>>,
    pub course: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub academic_qualifications: Option<Vec<AcademicQualification>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Uuid,
    pub roll_no: String,
    pub first_name: String,
    pub last_name: String,
    pub fathers_name: String,
    pub mothers_name: String,
    pub date_of_birth: Date,
    pub mobile: String,
    /// Stored lowercased.
    pub email: String,
    pub password: String,
    pub gender: Gender,
    pub departments: Vec<String>,
    pub course: String,
    pub city: String,
    pub address: String,
    pub academic_qualifications: Vec<AcademicQualification>,
    /// Set once at creation; update operations never touch it.
    #[serde(with = "time::serde::rfc3339")]
    pub registration_date: OffsetDateTime,
}

impl Student {
    /// Mint a stored record from a validated candidate. String fields are
    /// trimmed and the email is lowercased on the way in.
    pub fn create(c: RegisterStudent, now: OffsetDateTime) -> Student {
        log::trace!("Student::create( {:?}, {} ) called.", &c.roll_no, &now);

        Student {
            id: Uuid::new_v4(),
            roll_no: c.roll_no.trim().to_owned(),
            first_name: c.first_name.trim().to_owned(),
            last_name: c.last_name.trim().to_owned(),
            fathers_name: c.fathers_name.trim().to_owned(),
            mothers_name: c.mothers_name.trim().to_owned(),
            date_of_birth: c.date_of_birth,
            mobile: c.mobile,
            email: c.email.trim().to_lowercase(),
            password: c.password,
            gender: c.gender,
            departments: c.departments,
            course: c.course,
            city: c.city.trim().to_owned(),
            address: c.address.trim().to_owned(),
            academic_qualifications: c.academic_qualifications,
            registration_date: now,
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", &self.first_name, &self.last_name)
    }

    /// Fold a partial update into this record, leaving absent fields
    /// alone. The caller is responsible for re-validating the result.
    pub fn apply(&mut self, upd: UpdateStudent) {
        if let Some(s) = upd.roll_no { self.roll_no = s.trim().to_owned(); }
        if let Some(s) = upd.first_name { self.first_name = s.trim().to_owned(); }
        if let Some(s) = upd.last_name { self.last_name = s.trim().to_owned(); }
        if let Some(s) = upd.fathers_name { self.fathers_name = s.trim().to_owned(); }
        if let Some(s) = upd.mothers_name { self.mothers_name = s.trim().to_owned(); }
        if let Some(d) = upd.date_of_birth { self.date_of_birth = d; }
        if let Some(s) = upd.mobile { self.mobile = s; }
        if let Some(s) = upd.email { self.email = s.trim().to_lowercase(); }
        if let Some(g) = upd.gender { self.gender = g; }
        if let Some(v) = upd.departments { self.departments = v; }
        if let Some(s) = upd.course { self.course = s; }
        if let Some(s) = upd.city { self.city = s.trim().to_owned(); }
        if let Some(s) = upd.address { self.address = s.trim().to_owned(); }
        if let Some(v) = upd.academic_qualifications {
            self.academic_qualifications = v;
        }
    }

    /// The candidate-shaped view of this record, for re-running the
    /// registration validators after an update.
    pub fn as_candidate(&self) -> RegisterStudent {
        RegisterStudent {
            roll_no: self.roll_no.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            fathers_name: self.fathers_name.clone(),
            mothers_name: self.mothers_name.clone(),
            date_of_birth: self.date_of_birth,
            mobile: self.mobile.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
            gender: self.gender,
            departments: self.departments.clone(),
            course: self.course.clone(),
            city: self.city.clone(),
            address: self.address.clone(),
            academic_qualifications: self.academic_qualifications.clone(),
        }
    }
}

/// The public projection of a `Student`: every field except the password.
/// All list/get/update responses go out through this type.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentOut {
    pub id: Uuid,
    pub roll_no: String,
    pub first_name: String,
    pub last_name: String,
    pub fathers_name: String,
    pub mothers_name: String,
    pub date_of_birth: Date,
    pub mobile: String,
    pub email: String,
    pub gender: Gender,
    pub departments: Vec<String>,
    pub course: String,
    pub city: String,
    pub address: String,
    pub academic_qualifications: Vec<AcademicQualification>,
    #[serde(with = "time::serde::rfc3339")]
    pub registration_date: OffsetDateTime,
}

impl From<&Student> for StudentOut {
    fn from(s: &Student) -> StudentOut {
        StudentOut {
            id: s.id,
            roll_no: s.roll_no.clone(),
            first_name: s.first_name.clone(),
            last_name: s.last_name.clone(),
            fathers_name: s.fathers_name.clone(),
            mothers_name: s.mothers_name.clone(),
            date_of_birth: s.date_of_birth,
            mobile: s.mobile.clone(),
            email: s.email.clone(),
            gender: s.gender,
            departments: s.departments.clone(),
            course: s.course.clone(),
            city: s.city.clone(),
            address: s.address.clone(),
            academic_qualifications: s.academic_qualifications.clone(),
            registration_date: s.registration_date,
        }
    }
}
