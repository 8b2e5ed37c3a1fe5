//! Consistency policy.
//!
//! Two static tables: which TTL class each entity kind gets, and which
//! KeyFamilies each mutating platform operation must invalidate. Write
//! handlers pick their [`WriteOp`], get back an [`InvalidationPlan`], and
//! hand it to the coordinator strictly after the system-of-record commit.

use std::time::Duration;

use crate::keys::{CacheKey, EntityKind, KeyPrefix};

pub const EPHEMERAL_TTL_SECS: u64 = 300;
pub const VOLATILE_TTL_SECS: u64 = 3_600;
pub const STABLE_TTL_SECS: u64 = 86_400;
pub const WITNESS_TTL_SECS: u64 = 30 * 24 * 3_600;

/// TTL class of a cached view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TtlClass {
    /// Verification artifacts (OTP codes, pending signups): 5 minutes.
    Ephemeral,
    /// Collections mutated under concurrent multi-party action: 1 hour.
    Volatile,
    /// Entities that change rarely relative to read volume: 24 hours.
    Stable,
    /// Seen-witness markers: 30 days.
    Witness,
}

impl TtlClass {
    pub const fn seconds(self) -> u64 {
        match self {
            Self::Ephemeral => EPHEMERAL_TTL_SECS,
            Self::Volatile => VOLATILE_TTL_SECS,
            Self::Stable => STABLE_TTL_SECS,
            Self::Witness => WITNESS_TTL_SECS,
        }
    }

    pub const fn duration(self) -> Duration {
        Duration::from_secs(self.seconds())
    }
}

impl EntityKind {
    /// Default TTL class for views of this entity kind.
    pub const fn ttl_class(self) -> TtlClass {
        match self {
            EntityKind::GroupMessages
            | EntityKind::Messages
            | EntityKind::Complaints
            | EntityKind::Notices
            | EntityKind::Tasks
            // Geo vendor listings and society search pages are never
            // invalidated; the short TTL is their only freshness bound.
            | EntityKind::Vendors
            | EntityKind::Societies => TtlClass::Volatile,
            EntityKind::Society
            | EntityKind::Application
            | EntityKind::MyApplications
            | EntityKind::Bills
            | EntityKind::Notice
            | EntityKind::Event
            | EntityKind::AllEvents
            | EntityKind::Item
            | EntityKind::FriendReqTo
            | EntityKind::FriendReqFrom
            | EntityKind::FriendsList
            | EntityKind::StaffApplication
            | EntityKind::MyStaffApplications
            | EntityKind::MyWorkRequests => TtlClass::Stable,
            EntityKind::Seen => TtlClass::Witness,
        }
    }
}

/// A mutating platform operation, as seen by the cache layer.
///
/// Ids are the opaque document-store ids the request handler already holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    ApplicationSubmitted {
        society_id: String,
        applicant_id: String,
    },
    /// Approval or rejection; also refreshes the society snapshot, which the
    /// reviewing handler has in hand post-write.
    ApplicationReviewed {
        society_id: String,
        applicant_id: String,
    },
    BillIssued {
        society_id: String,
    },
    BillPaid {
        society_id: String,
    },
    /// Filing bumps the society's open-complaint state, so the handler
    /// refreshes the society snapshot it just rewrote.
    ComplaintFiled {
        society_id: String,
    },
    ComplaintResolved {
        society_id: String,
    },
    NoticeChanged {
        society_id: String,
        notice_id: String,
    },
    EventChanged {
        society_id: String,
        event_id: String,
    },
    ItemChanged {
        item_id: String,
    },
    /// Edit or delete of a message; every paginated view of the group goes.
    GroupMessageChanged {
        group_id: String,
    },
    /// Acceptance or rejection; both parties' request views go, and on
    /// acceptance both parties' friends listings too.
    FriendRequestResolved {
        sender_id: String,
        receiver_id: String,
        accepted: bool,
    },
    TaskChanged {
        society_id: String,
        assignee_id: String,
    },
    StaffApplicationReviewed {
        society_id: String,
        applicant_id: String,
    },
    WorkRequestChanged {
        vendor_id: String,
    },
    SocietyProfileUpdated {
        society_id: String,
    },
}

impl WriteOp {
    /// The statically-declared key set this operation makes stale.
    pub fn plan(&self) -> InvalidationPlan {
        let mut plan = InvalidationPlan::default();
        match self {
            Self::ApplicationSubmitted {
                society_id,
                applicant_id,
            } => {
                plan.prefix(EntityKind::Application, society_id);
                plan.key(CacheKey::new(EntityKind::MyApplications, applicant_id));
            }
            Self::ApplicationReviewed {
                society_id,
                applicant_id,
            } => {
                plan.prefix(EntityKind::Application, society_id);
                plan.key(CacheKey::new(EntityKind::MyApplications, applicant_id));
                plan.refresh(CacheKey::new(EntityKind::Society, society_id));
            }
            Self::BillIssued { society_id } | Self::BillPaid { society_id } => {
                plan.prefix(EntityKind::Bills, society_id);
                plan.key(CacheKey::new(EntityKind::Society, society_id));
            }
            Self::ComplaintFiled { society_id } => {
                plan.prefix(EntityKind::Complaints, society_id);
                plan.refresh(CacheKey::new(EntityKind::Society, society_id));
            }
            Self::ComplaintResolved { society_id } => {
                plan.prefix(EntityKind::Complaints, society_id);
                plan.key(CacheKey::new(EntityKind::Society, society_id));
            }
            // The society snapshot denormalizes its notice and event ids,
            // so it goes stale alongside the listings.
            Self::NoticeChanged {
                society_id,
                notice_id,
            } => {
                plan.key(CacheKey::new(EntityKind::Notice, notice_id));
                plan.prefix(EntityKind::Notices, society_id);
                plan.key(CacheKey::new(EntityKind::Society, society_id));
            }
            Self::EventChanged {
                society_id,
                event_id,
            } => {
                plan.key(CacheKey::new(EntityKind::Event, event_id));
                plan.prefix(EntityKind::AllEvents, society_id);
                plan.key(CacheKey::new(EntityKind::Society, society_id));
            }
            Self::ItemChanged { item_id } => {
                plan.key(CacheKey::new(EntityKind::Item, item_id));
            }
            Self::GroupMessageChanged { group_id } => {
                plan.prefix(EntityKind::GroupMessages, group_id);
            }
            Self::FriendRequestResolved {
                sender_id,
                receiver_id,
                accepted,
            } => {
                plan.key(CacheKey::new(EntityKind::FriendReqTo, receiver_id));
                plan.key(CacheKey::new(EntityKind::FriendReqFrom, sender_id));
                if *accepted {
                    plan.key(CacheKey::new(EntityKind::FriendsList, sender_id));
                    plan.key(CacheKey::new(EntityKind::FriendsList, receiver_id));
                }
            }
            Self::TaskChanged {
                society_id,
                assignee_id,
            } => {
                plan.key(CacheKey::new(EntityKind::Tasks, assignee_id).dim(society_id));
            }
            Self::StaffApplicationReviewed {
                society_id,
                applicant_id,
            } => {
                plan.prefix(EntityKind::StaffApplication, society_id);
                plan.key(CacheKey::new(
                    EntityKind::MyStaffApplications,
                    applicant_id,
                ));
            }
            Self::WorkRequestChanged { vendor_id } => {
                plan.key(CacheKey::new(EntityKind::MyWorkRequests, vendor_id));
            }
            Self::SocietyProfileUpdated { society_id } => {
                plan.refresh(CacheKey::new(EntityKind::Society, society_id));
            }
        }
        plan
    }
}

/// Key set a write makes stale: whole families, single extra keys, and
/// keys the caller should repopulate write-through with the fresh value.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InvalidationPlan {
    pub prefixes: Vec<KeyPrefix>,
    pub keys: Vec<CacheKey>,
    /// Keys better rewritten than deleted; the caller holds the
    /// authoritative post-write value and passes it to
    /// [`crate::invalidate::InvalidationCoordinator::refresh`].
    pub refresh: Vec<CacheKey>,
}

impl InvalidationPlan {
    pub fn prefix(&mut self, kind: EntityKind, id: impl Into<String>) -> &mut Self {
        self.prefixes.push(KeyPrefix::new(kind, id));
        self
    }

    pub fn key(&mut self, key: CacheKey) -> &mut Self {
        self.keys.push(key);
        self
    }

    pub fn refresh(&mut self, key: CacheKey) -> &mut Self {
        self.refresh.push(key);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty() && self.keys.is_empty() && self.refresh.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_classes_cover_spec_table() {
        assert_eq!(EntityKind::GroupMessages.ttl_class().seconds(), 3_600);
        assert_eq!(EntityKind::Messages.ttl_class().seconds(), 3_600);
        assert_eq!(EntityKind::Complaints.ttl_class().seconds(), 3_600);
        assert_eq!(EntityKind::Society.ttl_class().seconds(), 86_400);
        assert_eq!(EntityKind::Application.ttl_class().seconds(), 86_400);
        assert_eq!(EntityKind::Seen.ttl_class().seconds(), 30 * 24 * 3_600);
        assert_eq!(TtlClass::Ephemeral.seconds(), 300);
    }

    #[test]
    fn notice_listings_are_volatile_but_single_notices_are_stable() {
        assert_eq!(EntityKind::Notices.ttl_class(), TtlClass::Volatile);
        assert_eq!(EntityKind::Notice.ttl_class(), TtlClass::Stable);
    }

    #[test]
    fn uninvalidated_listings_get_the_short_ttl() {
        // Vendor geo listings and society search pages are never
        // invalidated, so TTL is their only freshness bound.
        assert_eq!(EntityKind::Vendors.ttl_class(), TtlClass::Volatile);
        assert_eq!(EntityKind::Societies.ttl_class(), TtlClass::Volatile);
    }

    #[test]
    fn application_review_touches_three_families() {
        let op = WriteOp::ApplicationReviewed {
            society_id: "S7".into(),
            applicant_id: "U3".into(),
        };
        let plan = op.plan();

        assert_eq!(
            plan.prefixes,
            vec![KeyPrefix::new(EntityKind::Application, "S7")]
        );
        assert_eq!(
            plan.keys,
            vec![CacheKey::new(EntityKind::MyApplications, "U3")]
        );
        assert_eq!(plan.refresh, vec![CacheKey::new(EntityKind::Society, "S7")]);
    }

    #[test]
    fn friend_acceptance_hits_request_views_and_both_friend_lists() {
        let op = WriteOp::FriendRequestResolved {
            sender_id: "U1".into(),
            receiver_id: "U2".into(),
            accepted: true,
        };
        let plan = op.plan();

        assert!(plan.prefixes.is_empty());
        assert_eq!(
            plan.keys,
            vec![
                CacheKey::new(EntityKind::FriendReqTo, "U2"),
                CacheKey::new(EntityKind::FriendReqFrom, "U1"),
                CacheKey::new(EntityKind::FriendsList, "U1"),
                CacheKey::new(EntityKind::FriendsList, "U2"),
            ]
        );
    }

    #[test]
    fn friend_rejection_spares_friend_lists() {
        let plan = WriteOp::FriendRequestResolved {
            sender_id: "U1".into(),
            receiver_id: "U2".into(),
            accepted: false,
        }
        .plan();

        assert_eq!(
            plan.keys,
            vec![
                CacheKey::new(EntityKind::FriendReqTo, "U2"),
                CacheKey::new(EntityKind::FriendReqFrom, "U1"),
            ]
        );
    }

    #[test]
    fn notice_and_event_changes_drop_the_society_snapshot() {
        let society_key = CacheKey::new(EntityKind::Society, "S1");

        let notice_plan = WriteOp::NoticeChanged {
            society_id: "S1".into(),
            notice_id: "N1".into(),
        }
        .plan();
        assert!(notice_plan.keys.contains(&society_key));

        let event_plan = WriteOp::EventChanged {
            society_id: "S1".into(),
            event_id: "E1".into(),
        }
        .plan();
        assert!(event_plan.keys.contains(&society_key));
    }

    #[test]
    fn complaint_filing_refreshes_the_society_snapshot() {
        let plan = WriteOp::ComplaintFiled {
            society_id: "S1".into(),
        }
        .plan();

        assert_eq!(
            plan.prefixes,
            vec![KeyPrefix::new(EntityKind::Complaints, "S1")]
        );
        assert_eq!(plan.refresh, vec![CacheKey::new(EntityKind::Society, "S1")]);
    }

    #[test]
    fn group_message_edit_drops_all_pages() {
        let plan = WriteOp::GroupMessageChanged {
            group_id: "G1".into(),
        }
        .plan();

        assert_eq!(
            plan.prefixes,
            vec![KeyPrefix::new(EntityKind::GroupMessages, "G1")]
        );
        assert!(plan.keys.is_empty());
    }

    #[test]
    fn task_key_is_scoped_to_assignee_and_society() {
        let plan = WriteOp::TaskChanged {
            society_id: "S1".into(),
            assignee_id: "U9".into(),
        }
        .plan();

        assert_eq!(plan.keys[0].render(), "All-tasks:U9:S1");
    }

    #[test]
    fn empty_plan_is_empty() {
        assert!(InvalidationPlan::default().is_empty());
        assert!(
            !WriteOp::ItemChanged {
                item_id: "I1".into()
            }
            .plan()
            .is_empty()
        );
    }
}
