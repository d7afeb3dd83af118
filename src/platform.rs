//! Platform wire records, grouped by service family.
//!
//! These are the typed request/response value objects the translator's
//! expand and flatten walk against. They mirror the Platform's proto schema
//! and are maintained by hand, matching the checked-in-generated-code
//! convention: plain prost messages, zero values for unset fields, nested
//! messages behind `Option`.
//!
//! Records are value objects. They are never shared across concurrent
//! reconciliations; every handler works on its own copy.

use prost_types::{Duration, Timestamp};

// ============================================================================
// Resource manager service
// ============================================================================

/// An organization, the root resource container.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Organization {
    /// Platform-assigned identifier.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Self URL of the organization.
    #[prost(string, tag = "2")]
    pub url: String,
    /// Display name.
    #[prost(string, tag = "3")]
    pub name: String,
    /// Free-form description.
    #[prost(string, tag = "4")]
    pub description: String,
    /// Creation time.
    #[prost(message, optional, tag = "5")]
    pub created_at: Option<Timestamp>,
    /// The pricing tier the organization is on.
    #[prost(message, optional, tag = "6")]
    pub tier: Option<Tier>,
    /// Whether destructive operations are blocked.
    #[prost(bool, tag = "7")]
    pub locked: bool,
}

/// The pricing tier of an organization.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Tier {
    /// Tier identifier, e.g. `free`.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Human-readable tier name.
    #[prost(string, tag = "2")]
    pub name: String,
    /// Whether support plans are available on this tier.
    #[prost(bool, tag = "3")]
    pub has_support_plans: bool,
    /// Whether backup uploads are available on this tier.
    #[prost(bool, tag = "4")]
    pub has_backup_uploads: bool,
    /// Whether deployments require terms-and-conditions acceptance.
    #[prost(bool, tag = "5")]
    pub requires_terms_and_conditions: bool,
}

/// A project within an organization.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Project {
    /// Platform-assigned identifier.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Self URL.
    #[prost(string, tag = "2")]
    pub url: String,
    /// Display name.
    #[prost(string, tag = "3")]
    pub name: String,
    /// Free-form description.
    #[prost(string, tag = "4")]
    pub description: String,
    /// Owning organization id.
    #[prost(string, tag = "5")]
    pub organization_id: String,
    /// Creation time.
    #[prost(message, optional, tag = "6")]
    pub created_at: Option<Timestamp>,
    /// Whether destructive operations are blocked.
    #[prost(bool, tag = "7")]
    pub locked: bool,
}

/// An invitation of a user into an organization.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OrganizationInvite {
    /// Platform-assigned identifier.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Target organization id.
    #[prost(string, tag = "2")]
    pub organization_id: String,
    /// Invited email address.
    #[prost(string, tag = "3")]
    pub email: String,
    /// Creation time.
    #[prost(message, optional, tag = "4")]
    pub created_at: Option<Timestamp>,
    /// Whether the invite has been accepted.
    #[prost(bool, tag = "5")]
    pub accepted: bool,
    /// Id of the accepting user, once accepted.
    #[prost(string, tag = "6")]
    pub user_id: String,
}

/// The current terms and conditions of an organization.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TermsAndConditions {
    /// Platform-assigned identifier.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Full content in markdown.
    #[prost(string, tag = "2")]
    pub content: String,
    /// Creation time.
    #[prost(message, optional, tag = "3")]
    pub created_at: Option<Timestamp>,
}

// ============================================================================
// Data service
// ============================================================================

/// A database deployment.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Deployment {
    /// Platform-assigned identifier.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Self URL.
    #[prost(string, tag = "2")]
    pub url: String,
    /// Display name.
    #[prost(string, tag = "3")]
    pub name: String,
    /// Free-form description.
    #[prost(string, tag = "4")]
    pub description: String,
    /// Owning project id.
    #[prost(string, tag = "5")]
    pub project_id: String,
    /// Region the deployment runs in.
    #[prost(string, tag = "6")]
    pub region_id: String,
    /// Database version, e.g. `3.11`.
    #[prost(string, tag = "7")]
    pub version: String,
    /// CA certificate used by the deployment.
    #[prost(string, tag = "8")]
    pub ca_certificate_id: String,
    /// IP allowlist guarding the deployment, if any.
    #[prost(string, tag = "9")]
    pub ip_allowlist_id: String,
    /// Deployment model and sizing.
    #[prost(message, optional, tag = "10")]
    pub model: Option<DeploymentModel>,
    /// Creation time.
    #[prost(message, optional, tag = "11")]
    pub created_at: Option<Timestamp>,
    /// Disk performance class.
    #[prost(string, tag = "12")]
    pub disk_performance_id: String,
    /// Addresses notified about deployment events.
    #[prost(message, optional, tag = "13")]
    pub notification_settings: Option<NotificationSettings>,
    /// Whether Foxx authentication is disabled.
    #[prost(bool, tag = "14")]
    pub disable_foxx_authentication: bool,
    /// Whether platform-level authentication is enabled.
    #[prost(bool, tag = "15")]
    pub is_platform_authentication_enabled: bool,
    /// Terms-and-conditions id the creator accepted.
    #[prost(string, tag = "16")]
    pub accepted_terms_and_conditions_id: String,
    /// Whether destructive operations are blocked.
    #[prost(bool, tag = "17")]
    pub locked: bool,
}

/// Model and sizing of a deployment.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeploymentModel {
    /// Model id: `oneshard`, `sharded`, `developer`, or `flexible`.
    #[prost(string, tag = "1")]
    pub model: String,
    /// Node size id; assigned by the Platform when left empty.
    #[prost(string, tag = "2")]
    pub node_size_id: String,
    /// Number of nodes.
    #[prost(int32, tag = "3")]
    pub node_count: i32,
    /// Disk size per node in GiB.
    #[prost(int32, tag = "4")]
    pub node_disk_size: i32,
}

/// Notification targets for a deployment.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NotificationSettings {
    /// Email addresses to notify.
    #[prost(string, repeated, tag = "1")]
    pub email_addresses: Vec<String>,
}

/// A selectable database version.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Version {
    /// Version string, e.g. `3.11`.
    #[prost(string, tag = "1")]
    pub version: String,
    /// Whether this is the region default.
    #[prost(bool, tag = "2")]
    pub is_default: bool,
}

/// A selectable node size in a region.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NodeSize {
    /// Node size identifier.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Human-readable name.
    #[prost(string, tag = "2")]
    pub name: String,
    /// Memory per node in GiB.
    #[prost(int32, tag = "3")]
    pub memory_size: i32,
    /// Smallest allowed disk per node in GiB.
    #[prost(int32, tag = "4")]
    pub min_disk_size: i32,
    /// Largest allowed disk per node in GiB.
    #[prost(int32, tag = "5")]
    pub max_disk_size: i32,
}

// ============================================================================
// Security service
// ============================================================================

/// A CA certificate within a project.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Certificate {
    /// Platform-assigned identifier.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Display name.
    #[prost(string, tag = "2")]
    pub name: String,
    /// Free-form description.
    #[prost(string, tag = "3")]
    pub description: String,
    /// Owning project id.
    #[prost(string, tag = "4")]
    pub project_id: String,
    /// Certificate lifetime; the schema renders this in seconds.
    #[prost(message, optional, tag = "5")]
    pub lifetime: Option<Duration>,
    /// Whether this is the project's default certificate.
    #[prost(bool, tag = "6")]
    pub is_default: bool,
    /// Whether a well-known (publicly trusted) certificate is used.
    #[prost(bool, tag = "7")]
    pub use_well_known_certificate: bool,
    /// Expiration time.
    #[prost(message, optional, tag = "8")]
    pub expires_at: Option<Timestamp>,
    /// Creation time.
    #[prost(message, optional, tag = "9")]
    pub created_at: Option<Timestamp>,
}

/// An IP allowlist within a project.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IpAllowlist {
    /// Platform-assigned identifier.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Display name.
    #[prost(string, tag = "2")]
    pub name: String,
    /// Free-form description.
    #[prost(string, tag = "3")]
    pub description: String,
    /// Owning project id.
    #[prost(string, tag = "4")]
    pub project_id: String,
    /// Allowed CIDR ranges.
    #[prost(string, repeated, tag = "5")]
    pub cidr_ranges: Vec<String>,
    /// Creation time.
    #[prost(message, optional, tag = "6")]
    pub created_at: Option<Timestamp>,
    /// Whether remote inspection is allowed through the allowlist.
    #[prost(bool, tag = "7")]
    pub remote_inspection_allowed: bool,
    /// Whether destructive operations are blocked.
    #[prost(bool, tag = "8")]
    pub locked: bool,
}

// ============================================================================
// Backup service
// ============================================================================

/// A backup of a deployment.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Backup {
    /// Platform-assigned identifier.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Self URL.
    #[prost(string, tag = "2")]
    pub url: String,
    /// Display name.
    #[prost(string, tag = "3")]
    pub name: String,
    /// Free-form description.
    #[prost(string, tag = "4")]
    pub description: String,
    /// Deployment the backup belongs to.
    #[prost(string, tag = "5")]
    pub deployment_id: String,
    /// Policy that produced the backup, if scheduled.
    #[prost(string, tag = "6")]
    pub backup_policy_id: String,
    /// Creation time.
    #[prost(message, optional, tag = "7")]
    pub created_at: Option<Timestamp>,
    /// Whether the backup is uploaded to cloud storage.
    #[prost(bool, tag = "8")]
    pub upload: bool,
    /// How long the backup is retained before automatic deletion, in days.
    #[prost(int32, tag = "9")]
    pub auto_deleted_at: i32,
}

/// A scheduled backup policy.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BackupPolicy {
    /// Platform-assigned identifier.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Display name.
    #[prost(string, tag = "2")]
    pub name: String,
    /// Free-form description.
    #[prost(string, tag = "3")]
    pub description: String,
    /// Deployment the policy applies to.
    #[prost(string, tag = "4")]
    pub deployment_id: String,
    /// Whether the schedule is paused.
    #[prost(bool, tag = "5")]
    pub is_paused: bool,
    /// Whether produced backups are uploaded.
    #[prost(bool, tag = "6")]
    pub upload: bool,
    /// Retention; the schema renders this in days.
    #[prost(message, optional, tag = "7")]
    pub retention_period: Option<Duration>,
    /// Who is emailed about policy runs, e.g. `FailureOnly`.
    #[prost(string, tag = "8")]
    pub email_notification: String,
    /// The schedule itself.
    #[prost(message, optional, tag = "9")]
    pub schedule: Option<BackupSchedule>,
    /// Creation time.
    #[prost(message, optional, tag = "10")]
    pub created_at: Option<Timestamp>,
    /// Whether destructive operations are blocked.
    #[prost(bool, tag = "11")]
    pub locked: bool,
}

/// When a backup policy runs.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BackupSchedule {
    /// Schedule type: `Hourly`, `Daily`, or `Monthly`.
    #[prost(string, tag = "1")]
    pub schedule_type: String,
    /// Hourly settings.
    #[prost(message, optional, tag = "2")]
    pub hourly: Option<HourlySchedule>,
    /// Daily settings.
    #[prost(message, optional, tag = "3")]
    pub daily: Option<DailySchedule>,
    /// Monthly settings.
    #[prost(message, optional, tag = "4")]
    pub monthly: Option<MonthlySchedule>,
}

/// Hourly backup schedule.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HourlySchedule {
    /// Interval between runs in hours.
    #[prost(int32, tag = "1")]
    pub schedule_every_interval_hours: i32,
}

/// Daily backup schedule with per-weekday flags.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DailySchedule {
    /// Run on Mondays.
    #[prost(bool, tag = "1")]
    pub monday: bool,
    /// Run on Tuesdays.
    #[prost(bool, tag = "2")]
    pub tuesday: bool,
    /// Run on Wednesdays.
    #[prost(bool, tag = "3")]
    pub wednesday: bool,
    /// Run on Thursdays.
    #[prost(bool, tag = "4")]
    pub thursday: bool,
    /// Run on Fridays.
    #[prost(bool, tag = "5")]
    pub friday: bool,
    /// Run on Saturdays.
    #[prost(bool, tag = "6")]
    pub saturday: bool,
    /// Run on Sundays.
    #[prost(bool, tag = "7")]
    pub sunday: bool,
    /// Time of day to run at.
    #[prost(message, optional, tag = "8")]
    pub schedule_at: Option<TimeOfDay>,
}

/// Monthly backup schedule.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MonthlySchedule {
    /// Day of the month to run on (1-31).
    #[prost(int32, tag = "1")]
    pub day_of_month: i32,
    /// Time of day to run at.
    #[prost(message, optional, tag = "2")]
    pub schedule_at: Option<TimeOfDay>,
}

/// A wall-clock time with timezone.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TimeOfDay {
    /// Hours (0-23).
    #[prost(int32, tag = "1")]
    pub hours: i32,
    /// Minutes (0-59).
    #[prost(int32, tag = "2")]
    pub minutes: i32,
    /// Timezone name, e.g. `UTC`.
    #[prost(string, tag = "3")]
    pub timezone: String,
}

// ============================================================================
// IAM service
// ============================================================================

/// A group of organization members.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IamGroup {
    /// Platform-assigned identifier.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Display name.
    #[prost(string, tag = "2")]
    pub name: String,
    /// Free-form description.
    #[prost(string, tag = "3")]
    pub description: String,
    /// Owning organization id.
    #[prost(string, tag = "4")]
    pub organization_id: String,
    /// Creation time.
    #[prost(message, optional, tag = "5")]
    pub created_at: Option<Timestamp>,
}

/// A custom role grouping permissions.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IamRole {
    /// Platform-assigned identifier.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Display name.
    #[prost(string, tag = "2")]
    pub name: String,
    /// Free-form description.
    #[prost(string, tag = "3")]
    pub description: String,
    /// Owning organization id.
    #[prost(string, tag = "4")]
    pub organization_id: String,
    /// Permissions granted by the role.
    #[prost(string, repeated, tag = "5")]
    pub permissions: Vec<String>,
    /// Creation time.
    #[prost(message, optional, tag = "6")]
    pub created_at: Option<Timestamp>,
}

// ============================================================================
// Network service
// ============================================================================

/// A private endpoint service attached to a deployment.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PrivateEndpointService {
    /// Platform-assigned identifier.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Display name.
    #[prost(string, tag = "2")]
    pub name: String,
    /// Free-form description.
    #[prost(string, tag = "3")]
    pub description: String,
    /// Deployment the endpoint fronts.
    #[prost(string, tag = "4")]
    pub deployment_id: String,
    /// Extra DNS names resolving to the endpoint.
    #[prost(string, repeated, tag = "5")]
    pub alternate_dns_names: Vec<String>,
    /// Whether private DNS is enabled.
    #[prost(bool, tag = "6")]
    pub enable_private_dns: bool,
    /// AWS principals allowed to connect.
    #[prost(message, repeated, tag = "7")]
    pub aws_principals: Vec<AwsPrincipal>,
    /// Creation time.
    #[prost(message, optional, tag = "8")]
    pub created_at: Option<Timestamp>,
}

/// An AWS principal granted access to a private endpoint.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AwsPrincipal {
    /// AWS account id.
    #[prost(string, tag = "1")]
    pub account_id: String,
    /// User names within the account, if restricted.
    #[prost(string, repeated, tag = "2")]
    pub user_names: Vec<String>,
    /// Role names within the account, if restricted.
    #[prost(string, repeated, tag = "3")]
    pub role_names: Vec<String>,
}

// ============================================================================
// Example service
// ============================================================================

/// An installable example dataset.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExampleDataset {
    /// Dataset identifier.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Display name.
    #[prost(string, tag = "2")]
    pub name: String,
    /// Free-form description.
    #[prost(string, tag = "3")]
    pub description: String,
    /// Creation time.
    #[prost(message, optional, tag = "4")]
    pub created_at: Option<Timestamp>,
}

/// An installation of an example dataset into a deployment.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExampleDatasetInstallation {
    /// Platform-assigned identifier.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Target deployment.
    #[prost(string, tag = "2")]
    pub deployment_id: String,
    /// Dataset being installed.
    #[prost(string, tag = "3")]
    pub example_dataset_id: String,
    /// Installation state, e.g. `Ready`.
    #[prost(string, tag = "4")]
    pub status: String,
    /// Creation time.
    #[prost(message, optional, tag = "5")]
    pub created_at: Option<Timestamp>,
}

// ============================================================================
// Audit service
// ============================================================================

/// An audit log collecting events for an organization.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuditLog {
    /// Platform-assigned identifier.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Display name.
    #[prost(string, tag = "2")]
    pub name: String,
    /// Free-form description.
    #[prost(string, tag = "3")]
    pub description: String,
    /// Owning organization id.
    #[prost(string, tag = "4")]
    pub organization_id: String,
    /// Whether this is the organization default audit log.
    #[prost(bool, tag = "5")]
    pub is_default: bool,
    /// Destinations events are delivered to.
    #[prost(message, repeated, tag = "6")]
    pub destinations: Vec<AuditLogDestination>,
    /// Creation time.
    #[prost(message, optional, tag = "7")]
    pub created_at: Option<Timestamp>,
}

/// One delivery destination of an audit log.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuditLogDestination {
    /// Destination type: `cloud` or `https-post`.
    #[prost(string, tag = "1")]
    pub destination_type: String,
    /// HTTPS POST settings, when the type is `https-post`.
    #[prost(message, optional, tag = "2")]
    pub http_post: Option<AuditLogHttpPost>,
}

/// HTTPS POST delivery settings.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuditLogHttpPost {
    /// URL events are posted to.
    #[prost(string, tag = "1")]
    pub url: String,
    /// Topics excluded from delivery.
    #[prost(string, repeated, tag = "2")]
    pub excluded_topics: Vec<String>,
}

// ============================================================================
// Platform service
// ============================================================================

/// A cloud provider deployments can run on.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CloudProvider {
    /// Provider identifier, e.g. `gcp`.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Human-readable name.
    #[prost(string, tag = "2")]
    pub name: String,
}

/// A region of a cloud provider.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Region {
    /// Region identifier, e.g. `gcp-europe-west4`.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Owning provider id.
    #[prost(string, tag = "2")]
    pub provider_id: String,
    /// Human-readable location.
    #[prost(string, tag = "3")]
    pub location: String,
    /// Whether new deployments may be placed here.
    #[prost(bool, tag = "4")]
    pub available: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_zero_values_match_unset_semantics() {
        let dep = Deployment::default();
        assert_eq!(dep.id, "");
        assert_eq!(dep.model, None);
        assert!(!dep.locked);
    }

    #[test]
    fn test_records_round_trip_on_the_wire() {
        let backup = Backup {
            id: "backup-1".to_string(),
            name: "nightly".to_string(),
            deployment_id: "dep-1".to_string(),
            upload: true,
            created_at: Some(prost_types::Timestamp {
                seconds: 1640998861,
                nanos: 0,
            }),
            ..Default::default()
        };
        let bytes = backup.encode_to_vec();
        let decoded = Backup::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, backup);
    }

    #[test]
    fn test_nested_messages_round_trip() {
        let policy = BackupPolicy {
            id: "policy-1".to_string(),
            schedule: Some(BackupSchedule {
                schedule_type: "Daily".to_string(),
                daily: Some(DailySchedule {
                    monday: true,
                    thursday: true,
                    schedule_at: Some(TimeOfDay {
                        hours: 10,
                        minutes: 10,
                        timezone: "UTC".to_string(),
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            retention_period: Some(prost_types::Duration {
                seconds: 200 * 24 * 3600,
                nanos: 0,
            }),
            ..Default::default()
        };
        let decoded = BackupPolicy::decode(policy.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded, policy);
    }
}
