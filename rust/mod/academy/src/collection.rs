use academy_core::{Role, ServiceError, Session};
use serde::{Deserialize, Serialize};

/// The flat store namespaces, one per entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Collection {
    Employees,
    Families,
    Students,
    Countries,
    Invoices,
    Salaries,
    Rules,
    Requests,
    Complaints,
    SmsMessages,
    TestReports,
    TestStatus,
}

impl Collection {
    pub const ALL: &'static [Collection] = &[
        Collection::Employees,
        Collection::Families,
        Collection::Students,
        Collection::Countries,
        Collection::Invoices,
        Collection::Salaries,
        Collection::Rules,
        Collection::Requests,
        Collection::Complaints,
        Collection::SmsMessages,
        Collection::TestReports,
        Collection::TestStatus,
    ];

    /// Store path of the collection.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Employees => "employees",
            Self::Families => "families",
            Self::Students => "children",
            Self::Countries => "countries",
            Self::Invoices => "invoices",
            Self::Salaries => "salaries",
            Self::Rules => "rules",
            Self::Requests => "requests",
            Self::Complaints => "complaints",
            Self::SmsMessages => "smsMessages",
            Self::TestReports => "testReports",
            Self::TestStatus => "testStatus",
        }
    }

    /// Singular noun used in messages ("create employee: ...").
    pub fn noun(&self) -> &'static str {
        match self {
            Self::Employees => "employee",
            Self::Families => "family",
            Self::Students => "student",
            Self::Countries => "country",
            Self::Invoices => "invoice",
            Self::Salaries => "salary",
            Self::Rules => "rule",
            Self::Requests => "request",
            Self::Complaints => "complaint",
            Self::SmsMessages => "sms message",
            Self::TestReports => "test report",
            Self::TestStatus => "test status",
        }
    }

    /// Full store path of one record.
    pub fn record_path(&self, key: &str) -> String {
        format!("{}/{key}", self.path())
    }

    /// Resolve a collection from its store path or a friendly alias
    /// (`students` for `children`, `sms` for `smsMessages`, ...).
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(c) = Self::ALL.iter().find(|c| c.path() == s) {
            return Some(*c);
        }
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "students" | "student" => Some(Self::Students),
            "sms" | "smsmessages" => Some(Self::SmsMessages),
            "testreports" => Some(Self::TestReports),
            "teststatus" | "tests" => Some(Self::TestStatus),
            other => Self::ALL.iter().copied().find(|c| c.path().to_ascii_lowercase() == other),
        }
    }

    /// Whether `role` sees this collection in the admin menu.
    pub fn visible_to(&self, role: Role) -> bool {
        match role {
            Role::Admin | Role::SuperAdmin => true,
            Role::Teacher => matches!(
                self,
                Self::Students | Self::TestReports | Self::TestStatus | Self::Rules
            ),
            Role::Parent | Role::Student => matches!(self, Self::Rules),
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Collections rendered in the menu for `role`, in menu order.
pub fn menu_for(role: Role) -> Vec<Collection> {
    Collection::ALL
        .iter()
        .copied()
        .filter(|c| c.visible_to(role))
        .collect()
}

/// Fail with `PermissionDenied` unless the session may write to `collection`.
///
/// Writes are admin-only; teachers may additionally record test reports and
/// move test statuses along.
pub fn ensure_can_manage(session: &Session, collection: Collection) -> Result<(), ServiceError> {
    if session.role == Role::Teacher
        && matches!(collection, Collection::TestReports | Collection::TestStatus)
    {
        return Ok(());
    }
    session.require_admin(&format!("modify {}", collection.path()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_the_store_namespaces() {
        let paths: Vec<&str> = Collection::ALL.iter().map(|c| c.path()).collect();
        assert_eq!(
            paths,
            vec![
                "employees", "families", "children", "countries", "invoices", "salaries",
                "rules", "requests", "complaints", "smsMessages", "testReports", "testStatus",
            ]
        );
    }

    #[test]
    fn parse_paths_and_aliases() {
        for c in Collection::ALL {
            assert_eq!(Collection::parse(c.path()), Some(*c));
        }
        assert_eq!(Collection::parse("students"), Some(Collection::Students));
        assert_eq!(Collection::parse("sms"), Some(Collection::SmsMessages));
        assert_eq!(Collection::parse("test-reports"), Some(Collection::TestReports));
        assert_eq!(Collection::parse("Complaints"), Some(Collection::Complaints));
        assert_eq!(Collection::parse("courses"), None);
    }

    #[test]
    fn record_path_joins_key() {
        assert_eq!(Collection::Students.record_path("k1"), "children/k1");
    }

    #[test]
    fn menu_gating_by_role() {
        assert_eq!(menu_for(Role::Admin).len(), Collection::ALL.len());
        assert_eq!(menu_for(Role::SuperAdmin).len(), Collection::ALL.len());
        assert_eq!(
            menu_for(Role::Teacher),
            vec![
                Collection::Students,
                Collection::Rules,
                Collection::TestReports,
                Collection::TestStatus,
            ]
        );
        assert_eq!(menu_for(Role::Parent), vec![Collection::Rules]);
        assert_eq!(menu_for(Role::Student), vec![Collection::Rules]);
    }

    #[test]
    fn manage_permissions() {
        let admin = Session::new("a", "Admin", Role::Admin);
        let teacher = Session::new("t", "Teacher", Role::Teacher);
        let parent = Session::new("p", "Parent", Role::Parent);

        assert!(ensure_can_manage(&admin, Collection::Invoices).is_ok());
        assert!(ensure_can_manage(&teacher, Collection::TestReports).is_ok());
        assert!(ensure_can_manage(&teacher, Collection::Invoices).is_err());
        let err = ensure_can_manage(&parent, Collection::Rules).unwrap_err();
        assert_eq!(err.error_code(), "PERMISSION_DENIED");
    }
}
