//! The closed catalogue of Hive custom resource kinds
//!
//! Every kind the provider manages is a variant of [`HiveKind`]. The API
//! coordinates (group, version, plural, scope) are compile-time constants so
//! an identity can be turned into a request path without a discovery round
//! trip.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// API group of the public Hive types
pub const HIVE_GROUP: &str = "hive.openshift.io";

/// API group of the internal Hive types
pub const HIVE_INTERNAL_GROUP: &str = "hiveinternal.openshift.io";

/// Whether objects of a kind live inside a namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Namespaced,
    Cluster,
}

/// Static API coordinates of a kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindDescriptor {
    pub group: &'static str,
    pub version: &'static str,
    pub kind: &'static str,
    pub plural: &'static str,
    /// Snake-case kind, used to build the provider type name
    pub snake: &'static str,
    pub scope: Scope,
}

/// A Hive custom resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HiveKind {
    Checkpoint,
    ClusterClaim,
    ClusterDeployment,
    ClusterDeprovision,
    ClusterImageSet,
    ClusterPool,
    ClusterProvision,
    ClusterRelocate,
    ClusterState,
    DnsZone,
    HiveConfig,
    MachinePool,
    MachinePoolNameLease,
    SelectorSyncIdentityProvider,
    SelectorSyncSet,
    SyncIdentityProvider,
    SyncSet,
    ClusterSync,
    ClusterSyncLease,
    FakeClusterInstall,
}

const fn hive(
    kind: &'static str,
    plural: &'static str,
    snake: &'static str,
    scope: Scope,
) -> KindDescriptor {
    KindDescriptor {
        group: HIVE_GROUP,
        version: "v1",
        kind,
        plural,
        snake,
        scope,
    }
}

const fn hive_internal(kind: &'static str, plural: &'static str, snake: &'static str) -> KindDescriptor {
    KindDescriptor {
        group: HIVE_INTERNAL_GROUP,
        version: "v1alpha1",
        kind,
        plural,
        snake,
        scope: Scope::Namespaced,
    }
}

impl HiveKind {
    /// Every supported kind, in declaration order
    pub const ALL: [HiveKind; 20] = [
        HiveKind::Checkpoint,
        HiveKind::ClusterClaim,
        HiveKind::ClusterDeployment,
        HiveKind::ClusterDeprovision,
        HiveKind::ClusterImageSet,
        HiveKind::ClusterPool,
        HiveKind::ClusterProvision,
        HiveKind::ClusterRelocate,
        HiveKind::ClusterState,
        HiveKind::DnsZone,
        HiveKind::HiveConfig,
        HiveKind::MachinePool,
        HiveKind::MachinePoolNameLease,
        HiveKind::SelectorSyncIdentityProvider,
        HiveKind::SelectorSyncSet,
        HiveKind::SyncIdentityProvider,
        HiveKind::SyncSet,
        HiveKind::ClusterSync,
        HiveKind::ClusterSyncLease,
        HiveKind::FakeClusterInstall,
    ];

    /// API coordinates for this kind
    pub const fn descriptor(self) -> KindDescriptor {
        use Scope::{Cluster, Namespaced};

        match self {
            Self::Checkpoint => hive("Checkpoint", "checkpoints", "checkpoint", Namespaced),
            Self::ClusterClaim => hive("ClusterClaim", "clusterclaims", "cluster_claim", Namespaced),
            Self::ClusterDeployment => hive(
                "ClusterDeployment",
                "clusterdeployments",
                "cluster_deployment",
                Namespaced,
            ),
            Self::ClusterDeprovision => hive(
                "ClusterDeprovision",
                "clusterdeprovisions",
                "cluster_deprovision",
                Namespaced,
            ),
            Self::ClusterImageSet => hive(
                "ClusterImageSet",
                "clusterimagesets",
                "cluster_image_set",
                Cluster,
            ),
            Self::ClusterPool => hive("ClusterPool", "clusterpools", "cluster_pool", Namespaced),
            Self::ClusterProvision => hive(
                "ClusterProvision",
                "clusterprovisions",
                "cluster_provision",
                Namespaced,
            ),
            Self::ClusterRelocate => hive(
                "ClusterRelocate",
                "clusterrelocates",
                "cluster_relocate",
                Cluster,
            ),
            Self::ClusterState => hive("ClusterState", "clusterstates", "cluster_state", Namespaced),
            Self::DnsZone => hive("DNSZone", "dnszones", "dns_zone", Namespaced),
            Self::HiveConfig => hive("HiveConfig", "hiveconfigs", "hive_config", Cluster),
            Self::MachinePool => hive("MachinePool", "machinepools", "machine_pool", Namespaced),
            Self::MachinePoolNameLease => hive(
                "MachinePoolNameLease",
                "machinepoolnameleases",
                "machine_pool_name_lease",
                Namespaced,
            ),
            Self::SelectorSyncIdentityProvider => hive(
                "SelectorSyncIdentityProvider",
                "selectorsyncidentityproviders",
                "selector_sync_identity_provider",
                Cluster,
            ),
            Self::SelectorSyncSet => hive(
                "SelectorSyncSet",
                "selectorsyncsets",
                "selector_sync_set",
                Cluster,
            ),
            Self::SyncIdentityProvider => hive(
                "SyncIdentityProvider",
                "syncidentityproviders",
                "sync_identity_provider",
                Namespaced,
            ),
            Self::SyncSet => hive("SyncSet", "syncsets", "sync_set", Namespaced),
            Self::ClusterSync => hive_internal("ClusterSync", "clustersyncs", "cluster_sync"),
            Self::ClusterSyncLease => {
                hive_internal("ClusterSyncLease", "clustersyncleases", "cluster_sync_lease")
            }
            Self::FakeClusterInstall => hive_internal(
                "FakeClusterInstall",
                "fakeclusterinstalls",
                "fake_cluster_install",
            ),
        }
    }

    pub fn group(self) -> &'static str {
        self.descriptor().group
    }

    pub fn version(self) -> &'static str {
        self.descriptor().version
    }

    /// The Kubernetes `kind` string, e.g. `DNSZone`
    pub fn kind(self) -> &'static str {
        self.descriptor().kind
    }

    pub fn plural(self) -> &'static str {
        self.descriptor().plural
    }

    pub fn scope(self) -> Scope {
        self.descriptor().scope
    }

    pub fn is_namespaced(self) -> bool {
        self.scope() == Scope::Namespaced
    }

    /// `group/version`, the value of `apiVersion` in manifests
    pub fn api_version(self) -> String {
        let d = self.descriptor();
        format!("{}/{}", d.group, d.version)
    }

    /// Provider type name, e.g. `hive_openshift_io_cluster_deployment_v1`
    pub fn type_name(self) -> String {
        let d = self.descriptor();
        format!("{}_{}_{}", d.group.replace('.', "_"), d.snake, d.version)
    }

    /// Provider type name of the offline manifest variant
    pub fn manifest_type_name(self) -> String {
        let d = self.descriptor();
        format!(
            "{}_{}_{}_manifest",
            d.group.replace('.', "_"),
            d.snake,
            d.version
        )
    }
}

impl fmt::Display for HiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

impl FromStr for HiveKind {
    type Err = CoreError;

    /// Accepts the kind (`ClusterDeployment`), its plural (`clusterdeployments`)
    /// or the provider type name, all case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        let needle = needle
            .strip_suffix("_manifest")
            .unwrap_or(needle.as_str());

        HiveKind::ALL
            .into_iter()
            .find(|kind| {
                let d = kind.descriptor();
                d.kind.eq_ignore_ascii_case(needle)
                    || d.plural == needle
                    || kind.type_name() == needle
            })
            .ok_or_else(|| CoreError::UnknownKind {
                name: s.to_string(),
            })
    }
}

impl TryFrom<String> for HiveKind {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HiveKind> for String {
    fn from(kind: HiveKind) -> Self {
        kind.kind().to_string()
    }
}
