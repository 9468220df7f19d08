use fake::Fake;
use fake::faker::address::en::CityName;
use fake::faker::name::en::{FirstName, LastName};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use unifill_core::{KeySource, Record, Value, record};

use super::TableJob;
use super::vocab::{self, pick};
use crate::model::{Reference, Target};
use crate::synth::Draw;

const YEAR: i64 = 365;

fn students_source(limit: u64) -> KeySource {
    KeySource::column("students", "student_id").limit(limit)
}

pub fn students() -> TableJob {
    TableJob {
        table: "students",
        columns: &[
            "first_name",
            "last_name",
            "birth_date",
            "email",
            "phone",
            "enrollment_date",
        ],
        serial_key: Some("student_id"),
        references: Vec::new(),
        foreign_keys: &[],
        unique: None,
        target: Target::Rows(500_000),
        synth: student,
    }
}

fn student(draw: &Draw<'_>, rng: &mut ChaCha8Rng) -> Record {
    let first: String = FirstName().fake_with_rng(rng);
    let last: String = LastName().fake_with_rng(rng);
    record![
        first,
        last,
        vocab::date_between(rng, -25 * YEAR, -17 * YEAR),
        format!("student_{}@university.edu", draw.index),
        vocab::phone(rng),
        vocab::date_between(rng, -5 * YEAR, 0)
    ]
}

pub fn professors() -> TableJob {
    TableJob {
        table: "professors",
        columns: &[
            "first_name",
            "last_name",
            "academic_degree",
            "email",
            "hire_date",
            "office_number",
        ],
        serial_key: Some("professor_id"),
        references: Vec::new(),
        foreign_keys: &[],
        unique: None,
        target: Target::Rows(20_000),
        synth: professor,
    }
}

fn professor(draw: &Draw<'_>, rng: &mut ChaCha8Rng) -> Record {
    let first: String = FirstName().fake_with_rng(rng);
    let last: String = LastName().fake_with_rng(rng);
    record![
        first,
        last,
        pick(rng, vocab::ACADEMIC_DEGREES),
        format!("prof_{}@university.edu", draw.index),
        vocab::date_between(rng, -30 * YEAR, -YEAR),
        format!(
            "{}-{}",
            rng.random_range(100..=500),
            rng.random_range(1..=50)
        )
    ]
}

pub fn professor_course_assignments() -> TableJob {
    TableJob {
        table: "professor_course_assignments",
        columns: &[
            "professor_id",
            "course_id",
            "semester_id",
            "hours_per_week",
            "is_primary_instructor",
        ],
        serial_key: Some("assignment_id"),
        references: vec![
            Reference::required(KeySource::column("professors", "professor_id")),
            Reference::required(KeySource::column("courses", "course_id")),
            Reference::required(KeySource::column("semesters", "semester_id")),
        ],
        foreign_keys: &[
            fk!("professor_id", "professors", "professor_id"),
            fk!("course_id", "courses", "course_id"),
            fk!("semester_id", "semesters", "semester_id"),
        ],
        unique: Some(&["professor_id", "course_id"]),
        target: Target::PerKey {
            reference: 0,
            per_key: 3,
        },
        synth: professor_course_assignment,
    }
}

fn professor_course_assignment(draw: &Draw<'_>, rng: &mut ChaCha8Rng) -> Record {
    record![
        draw.key(0).clone(),
        draw.key(1).clone(),
        draw.key(2).clone(),
        rng.random_range(2_i64..=8),
        rng.random_bool(0.5)
    ]
}

pub fn student_course_enrollments() -> TableJob {
    TableJob {
        table: "student_course_enrollments",
        columns: &[
            "student_id",
            "course_id",
            "semester_id",
            "enrollment_date",
            "enrollment_status",
        ],
        serial_key: Some("enrollment_id"),
        references: vec![
            Reference::required(students_source(500_000)),
            Reference::required(KeySource::column("courses", "course_id")),
            Reference::required(KeySource::column("semesters", "semester_id")),
        ],
        foreign_keys: &[
            fk!("student_id", "students", "student_id"),
            fk!("course_id", "courses", "course_id"),
            fk!("semester_id", "semesters", "semester_id"),
        ],
        unique: Some(&["student_id", "course_id"]),
        target: Target::PerKey {
            reference: 0,
            per_key: 8,
        },
        synth: student_course_enrollment,
    }
}

fn student_course_enrollment(draw: &Draw<'_>, rng: &mut ChaCha8Rng) -> Record {
    record![
        draw.key(0).clone(),
        draw.key(1).clone(),
        draw.key(2).clone(),
        vocab::date_between(rng, -2 * YEAR, 0),
        pick(rng, vocab::ENROLLMENT_STATUSES)
    ]
}

pub fn grades() -> TableJob {
    TableJob {
        table: "grades",
        columns: &[
            "student_id",
            "course_id",
            "professor_id",
            "semester_id",
            "grade_value",
            "grade_date",
            "exam_type",
        ],
        serial_key: Some("grade_id"),
        references: vec![
            Reference::required(students_source(250_000)),
            Reference::required(
                KeySource {
                    table: "professor_course_assignments".to_string(),
                    columns: vec!["course_id".to_string(), "professor_id".to_string()],
                    filter: None,
                    distinct: true,
                    limit: None,
                }
                .limit(10_000),
            ),
            Reference::required(KeySource::column("semesters", "semester_id")),
        ],
        foreign_keys: &[
            fk!("student_id", "students", "student_id"),
            fk!("course_id", "courses", "course_id"),
            fk!("professor_id", "professors", "professor_id"),
            fk!("semester_id", "semesters", "semester_id"),
        ],
        unique: None,
        target: Target::PerKey {
            reference: 0,
            per_key: 20,
        },
        synth: grade,
    }
}

/// Grades are given by a professor actually assigned to the course.
fn grade(draw: &Draw<'_>, rng: &mut ChaCha8Rng) -> Record {
    let assignment = draw.keys(1);
    record![
        draw.key(0).clone(),
        assignment.first().cloned().unwrap_or(Value::Null),
        assignment.get(1).cloned().unwrap_or(Value::Null),
        draw.key(2).clone(),
        vocab::money(rng, 2.0, 5.0),
        vocab::date_between(rng, -2 * YEAR, 0),
        pick(rng, vocab::EXAM_TYPES)
    ]
}

pub fn scholarships() -> TableJob {
    TableJob {
        table: "scholarships",
        columns: &[
            "student_id",
            "type_code",
            "amount",
            "start_date",
            "end_date",
            "application_date",
            "status",
        ],
        serial_key: Some("scholarship_id"),
        references: vec![Reference::required(students_source(100_000))],
        foreign_keys: &[fk!("student_id", "students", "student_id")],
        unique: None,
        target: Target::Rows(100_000),
        synth: scholarship,
    }
}

fn scholarship(draw: &Draw<'_>, rng: &mut ChaCha8Rng) -> Record {
    record![
        draw.key(0).clone(),
        pick(rng, vocab::SCHOLARSHIP_TYPES),
        vocab::money(rng, 3_000.0, 20_000.0),
        vocab::date_between(rng, -YEAR, 0),
        vocab::date_between(rng, 0, YEAR),
        vocab::date_between(rng, -2 * YEAR, 0),
        pick(rng, vocab::SCHOLARSHIP_STATUSES)
    ]
}

pub fn student_exchange_programs() -> TableJob {
    TableJob {
        table: "student_exchange_programs",
        columns: &[
            "student_id",
            "partnership_id",
            "semester_id",
            "destination_university",
            "courses_taken",
            "credits_transferred",
        ],
        serial_key: Some("exchange_id"),
        references: vec![
            Reference::required(students_source(50_000)),
            Reference::required(KeySource::column(
                "international_partnerships",
                "partnership_id",
            )),
            Reference::required(KeySource::column("semesters", "semester_id")),
        ],
        foreign_keys: &[
            fk!("student_id", "students", "student_id"),
            fk!(
                "partnership_id",
                "international_partnerships",
                "partnership_id"
            ),
            fk!("semester_id", "semesters", "semester_id"),
        ],
        unique: None,
        target: Target::Rows(5_000),
        synth: student_exchange_program,
    }
}

fn student_exchange_program(draw: &Draw<'_>, rng: &mut ChaCha8Rng) -> Record {
    let city: String = CityName().fake_with_rng(rng);
    record![
        draw.key(0).clone(),
        draw.key(1).clone(),
        draw.key(2).clone(),
        format!("University in {city}"),
        "Course1, Course2, Course3",
        rng.random_range(15_i64..=30)
    ]
}

pub fn professor_research_interests() -> TableJob {
    TableJob {
        table: "professor_research_interests",
        columns: &[
            "professor_id",
            "research_field",
            "expertise_level",
            "years_of_experience",
        ],
        serial_key: Some("interest_id"),
        references: vec![Reference::required(KeySource::column(
            "professors",
            "professor_id",
        ))],
        foreign_keys: &[fk!("professor_id", "professors", "professor_id")],
        unique: Some(&["professor_id", "research_field"]),
        target: Target::Rows(30_000),
        synth: professor_research_interest,
    }
}

fn professor_research_interest(draw: &Draw<'_>, rng: &mut ChaCha8Rng) -> Record {
    record![
        draw.key(0).clone(),
        pick(rng, vocab::RESEARCH_FIELDS),
        pick(rng, vocab::EXPERTISE_LEVELS),
        rng.random_range(1_i64..=25)
    ]
}

pub fn student_extracurricular_activities() -> TableJob {
    TableJob {
        table: "student_extracurricular_activities",
        columns: &[
            "student_id",
            "activity_type",
            "role",
            "start_date",
            "end_date",
            "hours_per_week",
        ],
        serial_key: Some("activity_id"),
        references: vec![Reference::required(students_source(200_000))],
        foreign_keys: &[fk!("student_id", "students", "student_id")],
        unique: None,
        target: Target::Rows(100_000),
        synth: student_extracurricular_activity,
    }
}

/// Roughly a third of activities are still ongoing and have no end date.
fn student_extracurricular_activity(draw: &Draw<'_>, rng: &mut ChaCha8Rng) -> Record {
    let start = vocab::date_between(rng, -3 * YEAR, -YEAR / 2);
    let end = rng
        .random_bool(0.7)
        .then(|| vocab::date_since(rng, start));
    record![
        draw.key(0).clone(),
        pick(rng, vocab::ACTIVITIES),
        pick(rng, vocab::ACTIVITY_ROLES),
        start,
        end,
        rng.random_range(2_i64..=15)
    ]
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn grades_keep_course_and_professor_together() {
        let student = [Value::Int(1)];
        let pair = [Value::Int(40), Value::Int(7)];
        let semester = [Value::Int(3)];
        let draw = Draw::new(0, 0, 0, vec![&student[..], &pair[..], &semester[..]]);
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let record = grade(&draw, &mut rng);
        assert_eq!(&record.values()[..4], &[
            Value::Int(1),
            Value::Int(40),
            Value::Int(7),
            Value::Int(3)
        ]);
    }

    #[test]
    fn ongoing_activities_have_no_end_date() {
        let student = [Value::Int(1)];
        let draw = Draw::new(0, 0, 0, vec![&student[..]]);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut open = 0;
        for _ in 0..200 {
            let record = student_extracurricular_activity(&draw, &mut rng);
            match (record.get(3), record.get(4)) {
                (Some(Value::Date(start)), Some(Value::Date(end))) => assert!(end >= start),
                (Some(Value::Date(_)), Some(Value::Null)) => open += 1,
                other => panic!("unexpected dates {other:?}"),
            }
        }
        assert!(open > 0 && open < 200);
    }
}
