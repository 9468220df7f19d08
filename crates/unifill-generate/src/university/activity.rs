use fake::Fake;
use fake::faker::address::en::CityName;
use fake::faker::barcode::en::Isbn13;
use fake::faker::company::en::Buzzword;
use fake::faker::lorem::en::Word;
use fake::faker::name::en::Name;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use unifill_core::{KeySource, Record, record};

use super::TableJob;
use super::academic::address;
use super::vocab::{self, pick};
use crate::model::{Reference, Target};
use crate::synth::Draw;

const YEAR: i64 = 365;

fn departments() -> Reference {
    Reference::required(KeySource::column("departments", "department_id"))
}

pub fn research_projects() -> TableJob {
    TableJob {
        table: "research_projects",
        columns: &[
            "department_id",
            "title",
            "budget",
            "start_date",
            "end_date",
            "status_code",
            "project_code",
        ],
        serial_key: Some("project_id"),
        references: vec![departments()],
        foreign_keys: &[fk!("department_id", "departments", "department_id")],
        unique: None,
        target: Target::Rows(100_000),
        synth: research_project,
    }
}

fn research_project(draw: &Draw<'_>, rng: &mut ChaCha8Rng) -> Record {
    let buzzword: String = Buzzword().fake_with_rng(rng);
    let word: String = Word().fake_with_rng(rng);
    record![
        draw.key(0).clone(),
        format!("Project '{buzzword} {word}'"),
        vocab::money(rng, 100_000.0, 5_000_000.0),
        vocab::date_between(rng, -3 * YEAR, -YEAR),
        vocab::date_between(rng, 0, 2 * YEAR),
        pick(rng, vocab::PROJECT_STATUSES),
        format!("PRJ-{:06}", draw.index)
    ]
}

pub fn library_resources() -> TableJob {
    TableJob {
        table: "library_resources",
        columns: &[
            "title",
            "author",
            "resource_type",
            "isbn",
            "available_copies",
            "department_id",
        ],
        serial_key: Some("resource_id"),
        references: vec![departments()],
        foreign_keys: &[fk!("department_id", "departments", "department_id")],
        unique: None,
        target: Target::Rows(200_000),
        synth: library_resource,
    }
}

fn library_resource(draw: &Draw<'_>, rng: &mut ChaCha8Rng) -> Record {
    let topic: String = Buzzword().fake_with_rng(rng);
    let author: String = Name().fake_with_rng(rng);
    let isbn: String = Isbn13().fake_with_rng(rng);
    record![
        format!("{topic} {}", pick(rng, vocab::RESOURCE_SUFFIXES)),
        author,
        pick(rng, vocab::RESOURCE_TYPES),
        isbn,
        rng.random_range(1_i64..=10),
        draw.key(0).clone()
    ]
}

pub fn international_partnerships() -> TableJob {
    TableJob {
        table: "international_partnerships",
        columns: &[
            "university_id",
            "partner_university",
            "country_code",
            "agreement_type",
            "start_date",
            "end_date",
            "agreement_number",
        ],
        serial_key: Some("partnership_id"),
        references: vec![Reference::required(KeySource::column(
            "universities",
            "university_id",
        ))],
        foreign_keys: &[fk!("university_id", "universities", "university_id")],
        unique: None,
        target: Target::Rows(500),
        synth: international_partnership,
    }
}

fn international_partnership(draw: &Draw<'_>, rng: &mut ChaCha8Rng) -> Record {
    let city: String = CityName().fake_with_rng(rng);
    record![
        draw.key(0).clone(),
        format!("University of {city}"),
        pick(rng, vocab::PARTNER_COUNTRIES),
        pick(rng, vocab::AGREEMENT_TYPES),
        vocab::date_between(rng, -5 * YEAR, -YEAR),
        vocab::date_between(rng, 0, 3 * YEAR),
        format!("AGR-{:06}", draw.index)
    ]
}

pub fn equipment_requests() -> TableJob {
    TableJob {
        table: "equipment_requests",
        columns: &[
            "department_id",
            "professor_id",
            "equipment_name",
            "equipment_type",
            "quantity",
            "budget",
            "request_date",
            "status",
            "priority",
        ],
        serial_key: Some("request_id"),
        references: vec![
            departments(),
            Reference::required(KeySource::column("professors", "professor_id")),
        ],
        foreign_keys: &[
            fk!("department_id", "departments", "department_id"),
            fk!("professor_id", "professors", "professor_id"),
        ],
        unique: None,
        target: Target::Rows(50_000),
        synth: equipment_request,
    }
}

fn equipment_request(draw: &Draw<'_>, rng: &mut ChaCha8Rng) -> Record {
    let word: String = Word().fake_with_rng(rng);
    record![
        draw.key(0).clone(),
        draw.key(1).clone(),
        format!("Equipment {word}"),
        pick(rng, vocab::EQUIPMENT_TYPES),
        rng.random_range(1_i64..=50),
        vocab::money(rng, 10_000.0, 500_000.0),
        vocab::date_between(rng, -YEAR, 0),
        pick(rng, vocab::REQUEST_STATUSES),
        rng.random_range(1_i64..=5)
    ]
}

pub fn university_events() -> TableJob {
    TableJob {
        table: "university_events",
        columns: &[
            "faculty_id",
            "event_name",
            "event_date",
            "event_type_code",
            "participants_count",
            "budget",
            "location",
        ],
        serial_key: Some("event_id"),
        references: vec![Reference::required(KeySource::column(
            "faculties",
            "faculty_id",
        ))],
        foreign_keys: &[fk!("faculty_id", "faculties", "faculty_id")],
        unique: None,
        target: Target::Rows(10_000),
        synth: university_event,
    }
}

fn university_event(draw: &Draw<'_>, rng: &mut ChaCha8Rng) -> Record {
    let word: String = Word().fake_with_rng(rng);
    record![
        draw.key(0).clone(),
        format!("Event {word}"),
        vocab::date_between(rng, -YEAR, YEAR),
        pick(rng, vocab::EVENT_TYPES),
        rng.random_range(10_i64..=1_000),
        vocab::money(rng, 1_000.0, 100_000.0),
        address(rng)
    ]
}

pub fn project_funding_sources() -> TableJob {
    TableJob {
        table: "project_funding_sources",
        columns: &[
            "project_id",
            "funder_name",
            "amount",
            "funding_type",
            "grant_number",
        ],
        serial_key: Some("funding_id"),
        references: vec![Reference::required(KeySource::column(
            "research_projects",
            "project_id",
        ))],
        foreign_keys: &[fk!("project_id", "research_projects", "project_id")],
        unique: None,
        target: Target::Rows(50_000),
        synth: project_funding_source,
    }
}

fn project_funding_source(draw: &Draw<'_>, rng: &mut ChaCha8Rng) -> Record {
    record![
        draw.key(0).clone(),
        pick(rng, vocab::FUNDERS),
        vocab::money(rng, 50_000.0, 2_000_000.0),
        pick(rng, vocab::FUNDING_TYPES),
        format!(
            "GRANT-{}-{}",
            rng.random_range(1_000..=9_999),
            rng.random_range(100..=999)
        )
    ]
}

pub fn resource_keywords() -> TableJob {
    TableJob {
        table: "resource_keywords",
        columns: &["resource_id", "keyword"],
        serial_key: None,
        references: vec![Reference::required(KeySource::column(
            "library_resources",
            "resource_id",
        ))],
        foreign_keys: &[fk!("resource_id", "library_resources", "resource_id")],
        unique: Some(&["resource_id", "keyword"]),
        target: Target::Rows(100_000),
        synth: resource_keyword,
    }
}

fn resource_keyword(draw: &Draw<'_>, rng: &mut ChaCha8Rng) -> Record {
    record![draw.key(0).clone(), pick(rng, vocab::KEYWORDS)]
}
