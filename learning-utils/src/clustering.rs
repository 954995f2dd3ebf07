use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::storage::{MemoryStorage, Storage};

pub const ACTIVE_CLUSTER_NAME: &str = "Active Participants";
pub const MODERATE_CLUSTER_NAME: &str = "Moderate Participants";
pub const AT_RISK_CLUSTER_NAME: &str = "At-Risk Students";

/// At or above this, students shift towards the active cluster
pub const HIGH_PERFORMANCE_THRESHOLD: f64 = 80.0;
/// Below this, students shift towards the at-risk cluster
pub const LOW_PERFORMANCE_THRESHOLD: f64 = 60.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngagementLevel {
    High,
    Medium,
    Low,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Stable,
    Improving,
    Declining,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentCluster {
    pub id: String,
    pub name: String,
    pub description: String,
    pub student_count: u32,
    pub engagement_level: EngagementLevel,
    pub color: String,
    pub prediction: Trend,
    /// Explicit roster. Empty unless students were assigned individually.
    pub students: Vec<String>,
}

/// The Active, Moderate and At-Risk buckets of one session, in that order
pub type SessionClusters = [StudentCluster; 3];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSignal {
    pub question_id: String,
    pub correct_percentage: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterUpdate {
    pub session_id: String,
    pub quiz_performance: Option<PerformanceSignal>,
}

pub fn default_clusters() -> SessionClusters {
    let cluster = |id: &str, name: &str, description: &str, count, level, color: &str, prediction| {
        StudentCluster {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            student_count: count,
            engagement_level: level,
            color: color.to_string(),
            prediction,
            students: vec![],
        }
    };

    [
        cluster(
            "1",
            ACTIVE_CLUSTER_NAME,
            "Highly engaged students",
            18,
            EngagementLevel::High,
            "#10b981",
            Trend::Stable,
        ),
        cluster(
            "2",
            MODERATE_CLUSTER_NAME,
            "Moderately engaged students",
            10,
            EngagementLevel::Medium,
            "#f59e0b",
            Trend::Improving,
        ),
        cluster(
            "3",
            AT_RISK_CLUSTER_NAME,
            "Low engagement, need support",
            4,
            EngagementLevel::Low,
            "#ef4444",
            Trend::Declining,
        ),
    ]
}

/// Redistributes the current population by the latest correct percentage.
///
/// The third bucket absorbs the rounding remainder, so the total is conserved.
/// Between the two thresholds the clusters are returned unchanged.
pub fn redistribute(current: &SessionClusters, correct_percentage: f64) -> SessionClusters {
    let total: u32 = current.iter().map(|c| c.student_count).sum();

    let (high_share, predictions) = if correct_percentage >= HIGH_PERFORMANCE_THRESHOLD {
        (6, [Trend::Stable, Trend::Improving, Trend::Declining])
    } else if correct_percentage < LOW_PERFORMANCE_THRESHOLD {
        (4, [Trend::Stable, Trend::Declining, Trend::Declining])
    } else {
        return current.clone();
    };

    // Integer tenths give the same floor as the fractional shares
    let high = total * high_share / 10;
    let medium = total * 3 / 10;
    let low = total.saturating_sub(high + medium);

    let mut next = current.clone();
    for ((cluster, count), prediction) in next.iter_mut().zip([high, medium, low]).zip(predictions)
    {
        cluster.student_count = count;
        cluster.prediction = prediction;
    }
    next
}

/// Cluster state per session id. One lock guards the whole store.
pub struct ClusterStore<S = MemoryStorage<String, SessionClusters>> {
    clusters: Mutex<S>,
}

impl ClusterStore {
    pub fn new() -> Self {
        Self::with_storage(MemoryStorage::new())
    }
}

impl Default for ClusterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> ClusterStore<S>
where
    S: Storage<String, SessionClusters>,
{
    pub fn with_storage(storage: S) -> Self {
        Self {
            clusters: Mutex::new(storage),
        }
    }

    /// Returns the session's clusters, creating the defaults on first access
    pub fn get_clusters(&self, session_id: &str) -> SessionClusters {
        let mut clusters = self.clusters.lock();
        get_or_init(&mut *clusters, session_id)
    }

    pub fn update_clusters(&self, update: ClusterUpdate) -> SessionClusters {
        let mut clusters = self.clusters.lock();
        let current = get_or_init(&mut *clusters, &update.session_id);

        let Some(signal) = update.quiz_performance else {
            return current;
        };

        let next = redistribute(&current, signal.correct_percentage);
        debug!(
            session = %update.session_id,
            question = %signal.question_id,
            correct_percentage = signal.correct_percentage,
            counts = ?next.iter().map(|c| c.student_count).collect::<Vec<_>>(),
            "clusters recalculated"
        );
        clusters.set(update.session_id, next.clone());
        next
    }

    /// Finds the cluster whose explicit roster lists the student
    pub fn get_student_cluster(&self, student_id: &str, session_id: &str) -> Option<String> {
        self.get_clusters(session_id)
            .iter()
            .find(|c| c.students.iter().any(|s| s == student_id))
            .map(|c| c.id.clone())
    }

    /// Places a student on a cluster's explicit roster, removing them from the others
    pub fn assign_student(&self, session_id: &str, cluster_id: &str, student_id: &str) -> bool {
        let mut clusters = self.clusters.lock();
        let mut current = get_or_init(&mut *clusters, session_id);
        if !current.iter().any(|c| c.id == cluster_id) {
            return false;
        }

        for cluster in current.iter_mut() {
            cluster.students.retain(|s| s != student_id);
            if cluster.id == cluster_id {
                cluster.students.push(student_id.to_string());
            }
        }
        clusters.set(session_id.to_string(), current);
        true
    }
}

fn get_or_init<S: Storage<String, SessionClusters>>(storage: &mut S, session_id: &str) -> SessionClusters {
    let key = session_id.to_string();
    if let Some(existing) = storage.get(&key) {
        return existing;
    }
    let clusters = default_clusters();
    storage.set(key, clusters.clone());
    clusters
}
