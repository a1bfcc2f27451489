//! Demo accounts for a fresh installation

use crate::error::Result;
use crate::services::auth::hash_password;
use crate::storage::StorageBackend;
use crate::types::{new_id, Faculty, Student};
use tracing::{debug, info};

const DEMO_SEMESTER: i64 = 5;
const DEMO_BRANCH: &str = "CS";

/// (usn, name, email, password)
const DEMO_STUDENTS: &[(&str, &str, &str, &str)] = &[
    ("4SC21CS001", "Mourya", "mourya@student.scem", "student123"),
    ("4SC21CS002", "Ritesh", "ritesh@student.scem", "student123"),
    ("4SC21CS003", "Praneeth", "praneeth@student.scem", "student123"),
    ("4SC21CS004", "Mithun", "mithun@student.scem", "student123"),
];

/// (name, email, password)
const DEMO_FACULTY: &[(&str, &str, &str)] = &[
    ("Vidya VV", "vidya@scem.ac.in", "vidya123"),
    ("Ashwini CS", "ashwini@scem.ac.in", "faculty123"),
    ("Srividya Bhat", "srividya@scem.ac.in", "faculty123"),
    ("Aparna", "aparna@scem.ac.in", "faculty123"),
    ("Prajwal", "prajwal@scem.ac.in", "faculty123"),
    ("Test Faculty", "test@scem.ac.in", "123"),
    ("Demo Faculty", "demo@scem.ac.in", "demo"),
    ("Faculty User", "faculty@scem.ac.in", "faculty"),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub students_added: usize,
    pub faculty_added: usize,
    pub skipped: usize,
}

/// Insert the demo students and faculty; existing accounts are left alone
pub async fn seed_demo_accounts(storage: &dyn StorageBackend) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    for (usn, name, email, password) in DEMO_STUDENTS {
        let student = Student {
            id: new_id(),
            usn: usn.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: hash_password(password)?,
            semester: DEMO_SEMESTER,
            branch: DEMO_BRANCH.to_string(),
        };

        if storage.insert_student(&student).await? {
            report.students_added += 1;
        } else {
            debug!("Student {} already present", usn);
            report.skipped += 1;
        }
    }

    for (name, email, password) in DEMO_FACULTY {
        let faculty = Faculty {
            id: new_id(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: hash_password(password)?,
            branch: DEMO_BRANCH.to_string(),
        };

        if storage.insert_faculty(&faculty).await? {
            report.faculty_added += 1;
        } else {
            debug!("Faculty {} already present", email);
            report.skipped += 1;
        }
    }

    info!(
        "Seeded {} students and {} faculty ({} skipped)",
        report.students_added, report.faculty_added, report.skipped
    );
    Ok(report)
}
