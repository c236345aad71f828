use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Identifier of a reservable object. Serializes as a bare integer and works
/// as a JSON map key (`{"12": [...]}`).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ReservableId(pub i64);

impl fmt::Display for ReservableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ReservationId(pub i64);

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ReservableType {
    Classroom,
    Vehicle,
    Teacher,
    Activity,
    Equipment,
    Group,
}

impl ReservableType {
    pub const ALL: [ReservableType; 6] = [
        ReservableType::Classroom,
        ReservableType::Vehicle,
        ReservableType::Teacher,
        ReservableType::Activity,
        ReservableType::Equipment,
        ReservableType::Group,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReservableType::Classroom => "classroom",
            ReservableType::Vehicle => "vehicle",
            ReservableType::Teacher => "teacher",
            ReservableType::Activity => "activity",
            ReservableType::Equipment => "equipment",
            ReservableType::Group => "group",
        }
    }
}

impl fmt::Display for ReservableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownReservableType(pub String);

impl fmt::Display for UnknownReservableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown reservable type `{}`", self.0)
    }
}

impl std::error::Error for UnknownReservableType {}

impl FromStr for ReservableType {
    type Err = UnknownReservableType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReservableType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownReservableType(s.to_string()))
    }
}

/// A reservable set as listed by `GET /sets/`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ReservableSet {
    pub key: String,
    pub label: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReservableObject {
    pub id: ReservableId,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ReservableType>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl ReservableObject {
    /// Classrooms are shown by slug, everything else by name.
    pub fn display_name(&self, kind: ReservableType) -> &str {
        match (kind, self.slug.as_deref()) {
            (ReservableType::Classroom, Some(slug)) if !slug.is_empty() => slug,
            _ => &self.name,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ResourceName {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ResourceCount {
    pub resource: ResourceName,
    pub n: u32,
}

/// Detail view of a reservable, `GET /reservables/{id}/`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReservableDetail {
    #[serde(flatten)]
    pub object: ReservableObject,
    #[serde(default)]
    pub nresources_set: Vec<ResourceCount>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ClassroomResource {
    pub id: i64,
    pub name: String,
}

/// `GET /classroom-resources/`: resource columns plus one row of counts per classroom.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ClassroomResources {
    #[serde(default)]
    pub resources: Vec<ClassroomResource>,
    #[serde(default)]
    pub reservable_table: Vec<(String, Vec<u32>)>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Page<T> {
    pub results: Vec<T>,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Reservation {
    pub id: ReservationId,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub owners: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
}

impl Reservation {
    pub fn is_well_formed(&self) -> bool {
        self.end > self.start
    }

    pub fn title(&self) -> &str {
        match self.reason.as_deref() {
            Some(reason) if !reason.trim().is_empty() => reason,
            _ => "Rezervacija",
        }
    }
}

/// Reservations of one day, grouped by reservable object.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct DaySnapshot {
    by_reservable: HashMap<ReservableId, Vec<Reservation>>,
}

impl DaySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: ReservableId, mut reservations: Vec<Reservation>) {
        reservations.sort_by_key(|r| r.start);
        self.by_reservable.insert(id, reservations);
    }

    /// Reservations for `id`, sorted by start. Absent ids yield an empty slice.
    pub fn for_reservable(&self, id: ReservableId) -> &[Reservation] {
        self.by_reservable
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn reservable_ids(&self) -> impl Iterator<Item = &ReservableId> {
        self.by_reservable.keys()
    }

    pub fn contains_reservation(&self, id: ReservationId) -> bool {
        self.by_reservable
            .values()
            .any(|reservations| reservations.iter().any(|r| r.id == id))
    }

    pub fn reservation_count(&self) -> usize {
        self.by_reservable.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.reservation_count() == 0
    }
}

impl FromIterator<(ReservableId, Vec<Reservation>)> for DaySnapshot {
    fn from_iter<I: IntoIterator<Item = (ReservableId, Vec<Reservation>)>>(iter: I) -> Self {
        let mut snapshot = DaySnapshot::new();
        for (id, reservations) in iter {
            snapshot.insert(id, reservations);
        }
        snapshot
    }
}
