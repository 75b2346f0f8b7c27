//! Role-gated access.
//!
//! One enumerated [`Role`] and one capability table decide which pages (and therefore which
//! operations) a user may reach. Every call site consults [`authorize`] or
//! [`authorize_operation`]; nothing compares role strings directly.
//!
//! A denied request is not an error in itself: the decision carries the page the user should
//! be sent to instead ([`Access::Redirect`]).

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Permission class of a user account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    StaffPendaftaran,
    Dokter,
    Kasir,
    Manajemen,
    Apoteker,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::SuperAdmin,
        Role::Admin,
        Role::StaffPendaftaran,
        Role::Dokter,
        Role::Kasir,
        Role::Manajemen,
        Role::Apoteker,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::StaffPendaftaran => "staff_pendaftaran",
            Role::Dokter => "dokter",
            Role::Kasir => "kasir",
            Role::Manajemen => "manajemen",
            Role::Apoteker => "apoteker",
        }
    }

    /// Pages this role may open.
    pub fn allowed_pages(self) -> &'static [Page] {
        match self {
            Role::SuperAdmin => &Page::ALL,
            Role::Admin => &[
                Page::Registration,
                Page::Visits,
                Page::Doctor,
                Page::Billing,
                Page::Reports,
            ],
            Role::StaffPendaftaran => &[Page::Registration, Page::Visits],
            Role::Dokter => &[Page::Visits, Page::Doctor],
            Role::Kasir => &[Page::Billing],
            Role::Manajemen => &[Page::Reports],
            Role::Apoteker => &[],
        }
    }

    /// Landing page, and the redirect target for a denied page.
    pub fn default_page(self) -> Page {
        match self {
            Role::Dokter => Page::Doctor,
            Role::Kasir => Page::Billing,
            Role::Manajemen => Page::Reports,
            _ => Page::Registration,
        }
    }

    pub fn can_open(self, page: Page) -> bool {
        self.allowed_pages().contains(&page)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s.trim())
            .ok_or_else(|| UnknownName::new("role", s))
    }
}

/// A front-end page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    Registration,
    Visits,
    Doctor,
    Billing,
    Reports,
    UserManagement,
}

impl Page {
    pub const ALL: [Page; 6] = [
        Page::Registration,
        Page::Visits,
        Page::Doctor,
        Page::Billing,
        Page::Reports,
        Page::UserManagement,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Page::Registration => "registration",
            Page::Visits => "visits",
            Page::Doctor => "doctor",
            Page::Billing => "billing",
            Page::Reports => "reports",
            Page::UserManagement => "user_management",
        }
    }

    /// Front-end route for the page.
    pub fn path(self) -> &'static str {
        match self {
            Page::Registration => "/",
            Page::Visits => "/visits",
            Page::Doctor => "/doctor",
            Page::Billing => "/billing",
            Page::Reports => "/reports",
            Page::UserManagement => "/users",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Page {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Page::ALL
            .into_iter()
            .find(|page| page.as_str() == s || page.path() == s)
            .ok_or_else(|| UnknownName::new("page", s))
    }
}

/// A request that names an unknown role or page.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind}: '{value}'")]
pub struct UnknownName {
    kind: &'static str,
    value: String,
}

impl UnknownName {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Outcome of an access check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Allow,
    /// Denied; send the user to this page instead.
    Redirect(Page),
}

impl Access {
    pub fn is_allowed(self) -> bool {
        matches!(self, Access::Allow)
    }
}

/// Decide whether `role` may open `page`.
pub fn authorize(role: Role, page: Page) -> Access {
    if role.can_open(page) {
        Access::Allow
    } else {
        Access::Redirect(role.default_page())
    }
}

/// Mutating and reading operations exposed over the API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    RegisterPatient,
    ListPatients,
    CreateVisit,
    ListVisits,
    RecordConsultation,
    ReadMedicalHistory,
    RecordPayment,
    ListTransactions,
    ViewReports,
    ManageUsers,
}

impl Operation {
    /// Pages whose holders may perform this operation. The first entry is the page the
    /// operation belongs to.
    pub fn pages(self) -> &'static [Page] {
        match self {
            Operation::RegisterPatient => &[Page::Registration],
            Operation::ListPatients => &[Page::Registration, Page::Visits, Page::Reports],
            Operation::CreateVisit => &[Page::Visits],
            Operation::ListVisits => &[Page::Visits, Page::Doctor, Page::Billing, Page::Reports],
            Operation::RecordConsultation => &[Page::Doctor],
            Operation::ReadMedicalHistory => &[Page::Doctor],
            Operation::RecordPayment => &[Page::Billing],
            Operation::ListTransactions => &[Page::Billing, Page::Reports],
            Operation::ViewReports => &[Page::Reports],
            Operation::ManageUsers => &[Page::UserManagement],
        }
    }

    pub fn home_page(self) -> Page {
        self.pages()[0]
    }
}

/// Decide whether `role` may perform `operation`.
pub fn authorize_operation(role: Role, operation: Operation) -> Access {
    if operation.pages().iter().any(|page| role.can_open(*page)) {
        Access::Allow
    } else {
        Access::Redirect(role.default_page())
    }
}
