use chrono::{Days, NaiveDate, NaiveTime};
use fake::Fake;
use fake::faker::phone_number::en::PhoneNumber;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// "Today" for every generated date, so runs do not drift with the clock.
pub fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 9, 1).unwrap_or_default()
}

pub const ACCREDITATION_LEVELS: &[&str] = &["I", "II", "III", "IV", "V"];

pub const FACULTY_NAMES: &[&str] = &[
    "Information Technology",
    "Economics",
    "Law",
    "Medicine",
    "Engineering",
    "Humanities",
    "Natural Sciences",
];

pub const DEPARTMENT_NAMES: &[&str] = &[
    "Programming",
    "Mathematics",
    "Physics",
    "Chemistry",
    "Biology",
    "History",
    "Philosophy",
    "Economics",
    "Law",
];

pub const PROGRAM_NAMES: &[&str] = &[
    "Computer Science",
    "Economics",
    "Jurisprudence",
    "Medicine",
    "Engineering",
    "Physics",
    "Chemistry",
    "Biology",
];

pub const DEGREE_TYPES: &[&str] = &["Bachelor", "Master", "Specialist"];

pub const COURSE_NAMES: &[&str] = &[
    "Calculus",
    "Programming",
    "Databases",
    "Physics",
    "Chemistry",
    "History",
    "Philosophy",
    "Economics",
];

pub const COURSE_TYPES: &[&str] = &["LEC", "LAB", "SEM", "PRJ", "PRC"];

pub const BACHELOR: &str = "Bachelor";
pub const MASTER: &str = "Master";
pub const COURSE_LEVELS: &[&str] = &[BACHELOR, MASTER];

pub const ACADEMIC_DEGREES: &[&str] = &["BSC", "MSC", "PHD", "DOC", "PROF"];

pub const CLASSROOM_EQUIPMENT: &[&str] = &["Computers", "Projector", "Laboratory", "Standard"];

pub const PROJECT_STATUSES: &[&str] = &["PLAN", "ACTIVE", "COMPL", "SUSP"];

pub const RESOURCE_SUFFIXES: &[&str] = &["Theory", "Practice", "Guide", "Manual"];

pub const RESOURCE_TYPES: &[&str] = &["Book", "Journal", "Article", "Dissertation", "Textbook"];

pub const PARTNER_COUNTRIES: &[&str] = &["RU", "US", "DE", "CN", "FR", "GB"];

pub const AGREEMENT_TYPES: &[&str] = &["Agreement", "Memorandum", "Exchange program"];

pub const ENROLLMENT_STATUSES: &[&str] = &["active", "completed", "dropped"];

pub const EXAM_TYPES: &[&str] = &["Exam", "Pass/fail", "Term paper"];

pub const SCHOLARSHIP_TYPES: &[&str] = &["ACAD", "SOC", "RES", "SPORT"];

pub const SCHOLARSHIP_STATUSES: &[&str] = &["active", "completed", "cancelled"];

pub const SCHEDULE_TYPES: &[&str] = &["Lecture", "Seminar", "Lab"];

pub const EQUIPMENT_TYPES: &[&str] = &["COMP", "LAB", "OFF", "MED"];

pub const REQUEST_STATUSES: &[&str] = &["pending", "approved", "rejected", "completed"];

pub const EVENT_TYPES: &[&str] = &["CONF", "SEMIN", "SPORT", "CULT", "MEET"];

pub const RESEARCH_FIELDS: &[&str] = &[
    "Artificial intelligence",
    "Machine learning",
    "Data science",
    "Cybersecurity",
    "Bioinformatics",
    "Quantum computing",
    "Robotics",
    "Internet of things",
    "Big data",
    "Cloud computing",
    "Blockchain",
    "Computer vision",
    "Natural language processing",
    "Neural networks",
    "Algorithm analysis",
    "Distributed systems",
    "Databases",
    "Software engineering",
    "Web technologies",
    "Mobile development",
    "DevOps",
    "Software testing",
    "Project management",
];

pub const EXPERTISE_LEVELS: &[&str] = &["Beginner", "Intermediate", "Advanced", "Expert"];

pub const FUNDERS: &[&str] = &[
    "Russian Science Foundation",
    "Ministry of Science and Higher Education",
    "Russian Foundation for Basic Research",
    "European Research Council",
    "National Institutes of Health",
    "National Science Foundation",
    "Skolkovo Foundation",
    "Innovation Center",
    "Venture investment",
    "Corporate funding",
    "International grants",
    "Private donors",
];

pub const FUNDING_TYPES: &[&str] = &["Grant", "Contract", "Donation", "Investment"];

pub const ACTIVITIES: &[&str] = &[
    "Sports section",
    "Science club",
    "Volunteering",
    "Student council",
    "Amateur arts",
    "Engineering club",
    "Debate",
    "Language club",
    "IT community",
    "Entrepreneurs club",
    "Environmental movement",
    "Heritage club",
    "Hiking club",
    "Photo club",
    "Theatre studio",
    "Band",
    "Dance",
    "Chess club",
    "Esports",
    "Media center",
];

pub const ACTIVITY_ROLES: &[&str] = &[
    "Member",
    "Active member",
    "Organizer",
    "Leader",
    "Coordinator",
    "Volunteer",
    "Council member",
    "Team captain",
];

pub const KEYWORDS: &[&str] = &[
    "programming",
    "algorithms",
    "databases",
    "artificial intelligence",
    "machine learning",
    "web development",
    "mobile apps",
    "cybersecurity",
    "networks",
    "operating systems",
    "data analysis",
    "statistics",
    "mathematics",
    "physics",
    "chemistry",
    "biology",
    "medicine",
    "economics",
    "management",
    "marketing",
    "finance",
    "law",
    "history",
    "philosophy",
    "psychology",
    "sociology",
    "linguistics",
    "literature",
    "art",
    "design",
    "architecture",
    "construction",
    "mechanics",
    "electronics",
    "robotics",
    "biotechnology",
    "nanotechnology",
    "ecology",
    "geography",
    "geology",
    "astronomy",
    "space",
];

pub fn pick(rng: &mut ChaCha8Rng, options: &'static [&'static str]) -> &'static str {
    options[rng.random_range(0..options.len())]
}

/// A date between `from` and `to` days relative to [`base_date`], inclusive.
pub fn date_between(rng: &mut ChaCha8Rng, from: i64, to: i64) -> NaiveDate {
    shift(base_date(), rng.random_range(from..=to))
}

/// A date between `start` and [`base_date`], or `start` itself if it is later.
pub fn date_since(rng: &mut ChaCha8Rng, start: NaiveDate) -> NaiveDate {
    let span = (base_date() - start).num_days().max(0);
    shift(start, rng.random_range(0..=span))
}

pub fn shift(date: NaiveDate, days: i64) -> NaiveDate {
    let magnitude = Days::new(days.unsigned_abs());
    let shifted = if days >= 0 {
        date.checked_add_days(magnitude)
    } else {
        date.checked_sub_days(magnitude)
    };
    shifted.unwrap_or(date)
}

/// Amount with two decimals in `[low, high)`.
pub fn money(rng: &mut ChaCha8Rng, low: f64, high: f64) -> f64 {
    (rng.random_range(low..high) * 100.0).round() / 100.0
}

/// Start of a class: on the hour or half past, between 08:00 and 18:30.
pub fn class_start(rng: &mut ChaCha8Rng) -> NaiveTime {
    let hour = rng.random_range(8..=18);
    let minute = if rng.random_bool(0.5) { 0 } else { 30 };
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

/// Phone numbers are capped at 15 characters to fit the column.
pub fn phone(rng: &mut ChaCha8Rng) -> String {
    let number: String = PhoneNumber().fake_with_rng(rng);
    number.chars().take(15).collect()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn dates_stay_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let today = base_date();
        for _ in 0..200 {
            let date = date_between(&mut rng, -365, 0);
            assert!(date <= today);
            assert!(date >= shift(today, -365));
        }
        let start = shift(today, -30);
        let later = date_since(&mut rng, start);
        assert!(later >= start && later <= today);
    }

    #[test]
    fn phones_fit_the_column() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(phone(&mut rng).chars().count() <= 15);
    }

    #[test]
    fn money_stays_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..100 {
            let amount = money(&mut rng, 3000.0, 20000.0);
            assert!((3000.0..=20000.0).contains(&amount));
        }
    }
}
