//! Caller identity and the ownership rule shared by links and files

use crate::config::AccessConfig;

/// The caller of an operation, already authenticated by the chat platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    pub id: i64,
    pub is_operator: bool,
}

impl Requester {
    pub fn user(id: i64) -> Self {
        Self {
            id,
            is_operator: false,
        }
    }

    pub fn operator(id: i64) -> Self {
        Self {
            id,
            is_operator: true,
        }
    }

    /// Owner of the record, or an operator
    pub fn may_manage(&self, owner_id: i64) -> bool {
        self.is_operator || self.id == owner_id
    }
}

impl AccessConfig {
    pub fn is_operator(&self, id: i64) -> bool {
        self.operator_ids.contains(&id)
    }

    pub fn requester(&self, id: i64) -> Requester {
        Requester {
            id,
            is_operator: self.is_operator(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_may_manage() {
        assert!(Requester::user(7).may_manage(7));
        assert!(!Requester::user(7).may_manage(8));
        assert!(Requester::operator(1).may_manage(8));
    }

    #[test]
    fn test_requester_from_access_config() {
        let access = AccessConfig {
            operator_ids: vec![100, 200],
        };
        assert_eq!(access.requester(200), Requester::operator(200));
        assert_eq!(access.requester(5), Requester::user(5));
    }
}
