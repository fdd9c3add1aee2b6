use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim, Volume};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A pod volume, reduced to what zone resolution needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeReference {
    /// Volume name within the pod spec
    pub name: String,
    /// Name of the referenced PersistentVolumeClaim, if the volume is PVC-backed
    pub claim_name: Option<String>,
}

impl VolumeReference {
    /// Create a PVC-backed volume reference
    pub fn claim(name: impl Into<String>, claim_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            claim_name: Some(claim_name.into()),
        }
    }

    /// Create a volume reference with no backing claim (emptyDir, configMap, ...)
    pub fn other(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            claim_name: None,
        }
    }

    /// The claim name, ignoring empty strings
    pub fn claim_name(&self) -> Option<&str> {
        self.claim_name.as_deref().filter(|c| !c.is_empty())
    }
}

impl From<&Volume> for VolumeReference {
    fn from(volume: &Volume) -> Self {
        Self {
            name: volume.name.clone(),
            claim_name: volume
                .persistent_volume_claim
                .as_ref()
                .map(|pvc| pvc.claim_name.clone()),
        }
    }
}

/// Lifecycle phase of a PersistentVolumeClaim
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClaimPhase {
    Pending,
    Bound,
    Lost,
    /// A phase this webhook does not know about, kept verbatim
    Unknown(String),
}

impl ClaimPhase {
    /// Parse the `status.phase` string of a claim
    pub fn parse(phase: &str) -> Self {
        match phase {
            "Pending" => ClaimPhase::Pending,
            "Bound" => ClaimPhase::Bound,
            "Lost" => ClaimPhase::Lost,
            other => ClaimPhase::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for ClaimPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimPhase::Pending => write!(f, "Pending"),
            ClaimPhase::Bound => write!(f, "Bound"),
            ClaimPhase::Lost => write!(f, "Lost"),
            ClaimPhase::Unknown(phase) => write!(f, "{}", phase),
        }
    }
}

/// The parts of a PersistentVolumeClaim consulted during zone resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRecord {
    pub namespace: String,
    pub name: String,
    pub phase: ClaimPhase,
    /// Name of the PersistentVolume the claim is bound to
    pub volume_name: Option<String>,
}

impl ClaimRecord {
    /// Create a claim bound to the given volume
    pub fn bound(
        namespace: impl Into<String>,
        name: impl Into<String>,
        volume_name: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            phase: ClaimPhase::Bound,
            volume_name: Some(volume_name.into()),
        }
    }

    /// Create a claim that is still waiting for a volume
    pub fn pending(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            phase: ClaimPhase::Pending,
            volume_name: None,
        }
    }

    /// The bound volume name, present only for `Bound` claims with a non-empty volume reference
    pub fn bound_volume(&self) -> Option<&str> {
        if self.phase != ClaimPhase::Bound {
            return None;
        }
        self.volume_name.as_deref().filter(|v| !v.is_empty())
    }
}

impl From<&PersistentVolumeClaim> for ClaimRecord {
    fn from(pvc: &PersistentVolumeClaim) -> Self {
        let phase = pvc
            .status
            .as_ref()
            .and_then(|s| s.phase.as_deref())
            .map(ClaimPhase::parse)
            .unwrap_or(ClaimPhase::Pending);

        Self {
            namespace: pvc.metadata.namespace.clone().unwrap_or_default(),
            name: pvc.metadata.name.clone().unwrap_or_default(),
            phase,
            volume_name: pvc.spec.as_ref().and_then(|s| s.volume_name.clone()),
        }
    }
}

/// The parts of a PersistentVolume consulted during zone resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeRecord {
    pub name: String,
    pub labels: BTreeMap<String, String>,
}

impl VolumeRecord {
    /// Create a volume record with no labels
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: BTreeMap::new(),
        }
    }

    /// Add a label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// The zone carried under `label`; empty values count as absent
    pub fn zone(&self, label: &str) -> Option<&str> {
        self.labels
            .get(label)
            .map(String::as_str)
            .filter(|z| !z.is_empty())
    }
}

impl From<&PersistentVolume> for VolumeRecord {
    fn from(pv: &PersistentVolume) -> Self {
        Self {
            name: pv.metadata.name.clone().unwrap_or_default(),
            labels: pv.metadata.labels.clone().unwrap_or_default(),
        }
    }
}

/// Distinct zone identifiers implied by a pod's volumes
///
/// Backed by an ordered set so patches are deterministic for a given input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneSet(BTreeSet<String>);

impl ZoneSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a zone. Empty identifiers are ignored. Returns true if the zone was new.
    pub fn insert(&mut self, zone: impl Into<String>) -> bool {
        let zone = zone.into();
        if zone.is_empty() {
            return false;
        }
        self.0.insert(zone)
    }

    pub fn contains(&self, zone: &str) -> bool {
        self.0.contains(zone)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Zone values in a form suitable for a match expression
    pub fn to_values(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for ZoneSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ZoneSet::new();
        set.extend(iter);
        set
    }
}

impl<S: Into<String>> Extend<S> for ZoneSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for zone in iter {
            self.insert(zone);
        }
    }
}

impl fmt::Display for ZoneSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let zones: Vec<&str> = self.iter().collect();
        write!(f, "[{}]", zones.join(","))
    }
}
