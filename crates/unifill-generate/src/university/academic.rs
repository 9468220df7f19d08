use chrono::{NaiveDate, TimeDelta};
use fake::Fake;
use fake::faker::address::en::{BuildingNumber, CityName, StreetName};
use fake::faker::company::en::CompanyName;
use fake::faker::lorem::en::Paragraph;
use fake::faker::name::en::Name;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use unifill_core::{KeySource, Record, record};

use super::vocab::{self, pick};
use super::TableJob;
use crate::model::{Reference, Target};
use crate::synth::Draw;

pub fn semesters() -> TableJob {
    TableJob {
        table: "semesters",
        columns: &["name", "start_date", "end_date", "is_current"],
        serial_key: Some("semester_id"),
        references: Vec::new(),
        foreign_keys: &[],
        unique: None,
        target: Target::Rows(12),
        synth: semester,
    }
}

/// Autumn and spring terms from autumn 2018 on; spring 2024 is current.
fn semester(draw: &Draw<'_>, _rng: &mut ChaCha8Rng) -> Record {
    let year = 2018 + (draw.index / 2) as i32;
    if draw.index % 2 == 0 {
        record![
            format!("Autumn {year}"),
            NaiveDate::from_ymd_opt(year, 9, 1),
            NaiveDate::from_ymd_opt(year, 12, 31),
            false
        ]
    } else {
        record![
            format!("Spring {}", year + 1),
            NaiveDate::from_ymd_opt(year + 1, 1, 15),
            NaiveDate::from_ymd_opt(year + 1, 5, 31),
            year == 2023
        ]
    }
}

pub fn universities() -> TableJob {
    TableJob {
        table: "universities",
        columns: &["name", "address", "founded_date", "accreditation_level"],
        serial_key: Some("university_id"),
        references: Vec::new(),
        foreign_keys: &[],
        unique: None,
        target: Target::Rows(5),
        synth: university,
    }
}

fn university(_draw: &Draw<'_>, rng: &mut ChaCha8Rng) -> Record {
    let company: String = CompanyName().fake_with_rng(rng);
    record![
        format!("University {company}"),
        address(rng),
        vocab::date_between(rng, -50 * 365, -10 * 365),
        pick(rng, vocab::ACCREDITATION_LEVELS)
    ]
}

pub(super) fn address(rng: &mut ChaCha8Rng) -> String {
    let number: String = BuildingNumber().fake_with_rng(rng);
    let street: String = StreetName().fake_with_rng(rng);
    let city: String = CityName().fake_with_rng(rng);
    format!("{number} {street}, {city}")
}

pub fn faculties() -> TableJob {
    TableJob {
        table: "faculties",
        columns: &["university_id", "name", "dean_name", "building_number"],
        serial_key: Some("faculty_id"),
        references: vec![Reference::required(KeySource::column(
            "universities",
            "university_id",
        ))],
        foreign_keys: &[fk!("university_id", "universities", "university_id")],
        unique: None,
        target: Target::PerKey {
            reference: 0,
            per_key: 4,
        },
        synth: faculty,
    }
}

fn faculty(draw: &Draw<'_>, rng: &mut ChaCha8Rng) -> Record {
    let dean: String = Name().fake_with_rng(rng);
    record![
        draw.key(0).clone(),
        format!("Faculty of {}", pick(rng, vocab::FACULTY_NAMES)),
        dean,
        rng.random_range(1..=10_i32).to_string()
    ]
}

pub fn departments() -> TableJob {
    TableJob {
        table: "departments",
        columns: &["faculty_id", "name", "head_name", "phone"],
        serial_key: Some("department_id"),
        references: vec![Reference::required(KeySource::column(
            "faculties",
            "faculty_id",
        ))],
        foreign_keys: &[fk!("faculty_id", "faculties", "faculty_id")],
        unique: None,
        target: Target::PerKey {
            reference: 0,
            per_key: 3,
        },
        synth: department,
    }
}

fn department(draw: &Draw<'_>, rng: &mut ChaCha8Rng) -> Record {
    let head: String = Name().fake_with_rng(rng);
    record![
        draw.key(0).clone(),
        format!("Department of {}", pick(rng, vocab::DEPARTMENT_NAMES)),
        head,
        vocab::phone(rng)
    ]
}

pub fn study_programs() -> TableJob {
    TableJob {
        table: "study_programs",
        columns: &["department_id", "name", "duration_years", "degree_type"],
        serial_key: Some("program_id"),
        references: vec![Reference::required(KeySource::column(
            "departments",
            "department_id",
        ))],
        foreign_keys: &[fk!("department_id", "departments", "department_id")],
        unique: None,
        target: Target::PerKey {
            reference: 0,
            per_key: 2,
        },
        synth: study_program,
    }
}

fn study_program(draw: &Draw<'_>, rng: &mut ChaCha8Rng) -> Record {
    record![
        draw.key(0).clone(),
        format!("{} program", pick(rng, vocab::PROGRAM_NAMES)),
        rng.random_range(4_i64..=6),
        pick(rng, vocab::DEGREE_TYPES)
    ]
}

pub fn courses() -> TableJob {
    TableJob {
        table: "courses",
        columns: &[
            "program_id",
            "name",
            "course_code",
            "course_type",
            "credits",
            "description",
            "course_level",
        ],
        serial_key: Some("course_id"),
        references: vec![Reference::required(KeySource::column(
            "study_programs",
            "program_id",
        ))],
        foreign_keys: &[fk!("program_id", "study_programs", "program_id")],
        unique: None,
        target: Target::PerKey {
            reference: 0,
            per_key: 8,
        },
        synth: course,
    }
}

fn course(draw: &Draw<'_>, rng: &mut ChaCha8Rng) -> Record {
    let program = draw.key(0);
    let description: String = Paragraph(1..3).fake_with_rng(rng);
    record![
        program.clone(),
        format!(
            "{} {}",
            pick(rng, vocab::COURSE_NAMES),
            rng.random_range(1..=4)
        ),
        format!(
            "COURSE-{}-{}",
            program.as_i64().unwrap_or_default(),
            draw.slot
        ),
        pick(rng, vocab::COURSE_TYPES),
        rng.random_range(2_i64..=6),
        description.chars().take(200).collect::<String>(),
        pick(rng, vocab::COURSE_LEVELS)
    ]
}

pub fn classrooms() -> TableJob {
    TableJob {
        table: "classrooms",
        columns: &[
            "building_id",
            "room_number",
            "capacity",
            "equipment_type",
            "is_laboratory",
        ],
        serial_key: Some("classroom_id"),
        references: Vec::new(),
        foreign_keys: &[],
        unique: None,
        target: Target::Rows(1_000),
        synth: classroom,
    }
}

fn classroom(_draw: &Draw<'_>, rng: &mut ChaCha8Rng) -> Record {
    record![
        rng.random_range(1_i64..=10),
        format!(
            "{}-{}",
            rng.random_range(1..=5),
            rng.random_range(100..=500)
        ),
        rng.random_range(20_i64..=300),
        pick(rng, vocab::CLASSROOM_EQUIPMENT),
        rng.random_bool(0.5)
    ]
}

pub fn student_groups() -> TableJob {
    TableJob {
        table: "student_groups",
        columns: &["program_id", "name", "start_year", "curator_id"],
        serial_key: Some("group_id"),
        references: vec![
            Reference::required(KeySource::column("study_programs", "program_id")),
            Reference::optional(KeySource::column("professors", "professor_id")),
        ],
        foreign_keys: &[
            fk!("program_id", "study_programs", "program_id"),
            fk!("curator_id", "professors", "professor_id"),
        ],
        unique: None,
        target: Target::PerKey {
            reference: 0,
            per_key: 3,
        },
        synth: student_group,
    }
}

fn student_group(draw: &Draw<'_>, rng: &mut ChaCha8Rng) -> Record {
    let program = draw.key(0);
    record![
        program.clone(),
        format!(
            "Group {}-{}",
            program.as_i64().unwrap_or_default(),
            draw.slot + 1
        ),
        rng.random_range(2020_i64..=2023),
        draw.key(1).clone()
    ]
}

pub fn schedules() -> TableJob {
    TableJob {
        table: "schedules",
        columns: &[
            "course_id",
            "professor_id",
            "group_id",
            "classroom_id",
            "day_of_week",
            "start_time",
            "end_time",
            "schedule_type",
        ],
        serial_key: Some("schedule_id"),
        references: vec![
            Reference::required(KeySource::column("courses", "course_id")),
            Reference::required(KeySource::column("professors", "professor_id")),
            Reference::required(KeySource::column("student_groups", "group_id")),
            Reference::required(KeySource::column("classrooms", "classroom_id")),
        ],
        foreign_keys: &[
            fk!("course_id", "courses", "course_id"),
            fk!("professor_id", "professors", "professor_id"),
            fk!("group_id", "student_groups", "group_id"),
            fk!("classroom_id", "classrooms", "classroom_id"),
        ],
        unique: None,
        target: Target::Rows(50_000),
        synth: schedule,
    }
}

/// Weekday classes of ninety minutes.
fn schedule(draw: &Draw<'_>, rng: &mut ChaCha8Rng) -> Record {
    let start = vocab::class_start(rng);
    record![
        draw.key(0).clone(),
        draw.key(1).clone(),
        draw.key(2).clone(),
        draw.key(3).clone(),
        rng.random_range(1_i64..=5),
        start,
        start + TimeDelta::minutes(90),
        pick(rng, vocab::SCHEDULE_TYPES)
    ]
}

pub fn course_prerequisites() -> TableJob {
    TableJob {
        table: "course_prerequisites",
        columns: &["course_id", "required_course_id", "min_grade", "is_mandatory"],
        serial_key: None,
        references: vec![
            Reference::required(
                KeySource::column("courses", "course_id").filter_eq("course_level", vocab::MASTER),
            ),
            Reference::required(
                KeySource::column("courses", "course_id").filter_eq("course_level", vocab::BACHELOR),
            ),
        ],
        foreign_keys: &[
            fk!("course_id", "courses", "course_id"),
            fk!("required_course_id", "courses", "course_id"),
        ],
        unique: Some(&["course_id", "required_course_id"]),
        target: Target::Rows(5_000),
        synth: course_prerequisite,
    }
}

/// A master's course requiring a bachelor's course.
fn course_prerequisite(draw: &Draw<'_>, rng: &mut ChaCha8Rng) -> Record {
    record![
        draw.key(0).clone(),
        draw.key(1).clone(),
        vocab::money(rng, 3.0, 4.5),
        rng.random_bool(0.5)
    ]
}
