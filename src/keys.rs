//! Cache key construction.
//!
//! Defines the entity-type tags used across the platform, the [`CacheKey`]
//! rendered form stored in the key-value store, and the [`KeyPrefix`] form
//! used to invalidate a whole KeyFamily at once.

use std::fmt;

/// Entity-type tag identifying which platform collection a key belongs to.
///
/// Tags render as stable strings; two logically equal keys always render
/// identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Society profile snapshot.
    Society,
    /// Membership applications of one society (filterable by status).
    Application,
    /// Applications submitted by one user.
    MyApplications,
    /// Bill listings of one society.
    Bills,
    /// Complaint listings of one society.
    Complaints,
    /// A single notice.
    Notice,
    /// Notice listings of one society.
    Notices,
    /// A single event.
    Event,
    /// Event listings of one society.
    AllEvents,
    /// A single marketplace item.
    Item,
    /// Paginated message views of one group.
    GroupMessages,
    /// Paginated direct-message views between two users
    /// (see [`CacheKey::direct_messages`]).
    Messages,
    /// Friend requests received by one user.
    FriendReqTo,
    /// Friend requests sent by one user.
    FriendReqFrom,
    /// One user's accepted-friends listing.
    FriendsList,
    /// Task listings per assignee.
    Tasks,
    /// Staff applications of one society.
    StaffApplication,
    /// Staff applications submitted by one user.
    MyStaffApplications,
    /// Work requests addressed to one vendor.
    MyWorkRequests,
    /// Vendor listings keyed by location.
    Vendors,
    /// Paginated society search/browse listings
    /// (see [`CacheKey::society_search`]).
    Societies,
    /// Seen-witness markers (see [`CacheKey::seen_witness`]).
    Seen,
}

impl EntityKind {
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Society => "Society",
            Self::Application => "Application",
            Self::MyApplications => "MyApplication",
            Self::Bills => "Bills",
            Self::Complaints => "Complaints",
            Self::Notice => "Notice",
            Self::Notices => "Notices",
            Self::Event => "Event",
            Self::AllEvents => "AllEvents",
            Self::Item => "Item",
            Self::GroupMessages => "groupMessages",
            Self::Messages => "messages",
            Self::FriendReqTo => "FriendReq_To",
            Self::FriendReqFrom => "FriendReq_From",
            Self::FriendsList => "Friends",
            Self::Tasks => "All-tasks",
            Self::StaffApplication => "StaffApplication",
            Self::MyStaffApplications => "MyStaffApplications",
            Self::MyWorkRequests => "MyWorkRequests",
            Self::Vendors => "Vendors",
            Self::Societies => "Societies",
            Self::Seen => "Seen",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One cached view: entity tag, primary id, and zero or more ordered query
/// dimensions (status, limit, before-cursor, sort, search term).
///
/// Renders as `tag:id[:dim...]`. Dimension order is the call order at the
/// key-building site, which must be a single place per view for stability.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: EntityKind,
    id: String,
    dims: Vec<String>,
}

impl CacheKey {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            dims: Vec::new(),
        }
    }

    /// Append a query dimension. Builder-style, ordered.
    #[must_use]
    pub fn dim(mut self, value: impl ToString) -> Self {
        self.dims.push(value.to_string());
        self
    }

    /// One page of the 1:1 conversation as seen by `user_id`. The family
    /// is the viewing user, so all of their conversation pages invalidate
    /// together.
    pub fn direct_messages(
        user_id: &str,
        receiver_id: &str,
        limit: usize,
        before: &str,
    ) -> Self {
        Self::new(EntityKind::Messages, user_id)
            .dim(receiver_id)
            .dim(limit)
            .dim(before)
    }

    /// One page of the society search/browse listing. The search term is
    /// part of the id, so every `(search, skip, limit)` triple is its own
    /// key; nothing invalidates these, they lapse at TTL.
    pub fn society_search(search: &str, skip: usize, limit: usize) -> Self {
        Self::new(EntityKind::Societies, format!("search={search}"))
            .dim(format!("skip={skip}"))
            .dim(format!("limit={limit}"))
    }

    /// Marker key recording "user has had all prior items in this
    /// collection marked seen", so the bulk mark-seen write runs once per
    /// witness lifetime rather than on every page fetch.
    pub fn seen_witness(user_id: &str, collection_id: &str) -> Self {
        Self::new(EntityKind::Seen, user_id).dim(collection_id)
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The KeyFamily this key belongs to.
    pub fn family(&self) -> KeyPrefix {
        KeyPrefix::new(self.kind, self.id.clone())
    }

    pub fn render(&self) -> String {
        let mut out = format!("{}:{}", self.kind.tag(), self.id);
        for dim in &self.dims {
            out.push(':');
            out.push_str(dim);
        }
        out
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Prefix form of a KeyFamily, used for bulk invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPrefix {
    kind: EntityKind,
    id: String,
}

impl KeyPrefix {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// The bare `tag:id` base shared by every key in the family.
    pub fn render(&self) -> String {
        format!("{}:{}", self.kind.tag(), self.id)
    }

    /// True for the bare entity key and any key extending it with `:`.
    ///
    /// A different id that merely string-extends this one (`G1` vs `G10`)
    /// never matches.
    pub fn matches(&self, key: &str) -> bool {
        let base = self.render();
        match key.strip_prefix(base.as_str()) {
            Some("") => true,
            Some(rest) => rest.starts_with(':'),
            None => false,
        }
    }
}

impl fmt::Display for KeyPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
