//! The `oasis_backup_policy` resource: scheduled backups.
//!
//! Retention is expressed in days at the schema surface and converted to
//! the Platform's duration on the wire.

use crate::api::Context;
use crate::diff::ChangeSet;
use crate::error::ProviderError;
use crate::platform::{
    BackupPolicy, BackupSchedule, DailySchedule, HourlySchedule, MonthlySchedule, TimeOfDay,
};
use crate::reconcile::ResourceKind;
use crate::schema::{Attribute, Block, DiffSuppress, NestedBlock, Schema};
use crate::translate::{days_from_duration, duration_from_days, AttrMap, Flat, Plan};
use async_trait::async_trait;

/// Manages backup policies attached to a deployment.
pub struct BackupPolicyKind;

fn time_of_day_block() -> Block {
    Block::new()
        .with_attribute("hours", Attribute::optional_int64())
        .with_attribute("minutes", Attribute::optional_int64())
        .with_attribute("timezone", Attribute::optional_string())
}

fn schedule_block() -> NestedBlock {
    NestedBlock::single(
        Block::new()
            .with_attribute("schedule_type", Attribute::required_string())
            .with_block(
                "hourly",
                NestedBlock::single(Block::new().with_attribute(
                    "schedule_every_interval_hours",
                    Attribute::optional_int64(),
                )),
            )
            .with_block(
                "daily",
                NestedBlock::single(
                    Block::new()
                        .with_attribute("monday", Attribute::optional_bool())
                        .with_attribute("tuesday", Attribute::optional_bool())
                        .with_attribute("wednesday", Attribute::optional_bool())
                        .with_attribute("thursday", Attribute::optional_bool())
                        .with_attribute("friday", Attribute::optional_bool())
                        .with_attribute("saturday", Attribute::optional_bool())
                        .with_attribute("sunday", Attribute::optional_bool())
                        .with_block("schedule_at", NestedBlock::single(time_of_day_block())),
                ),
            )
            .with_block(
                "monthly",
                NestedBlock::single(
                    Block::new()
                        .with_attribute("day_of_month", Attribute::optional_int64())
                        .with_block("schedule_at", NestedBlock::single(time_of_day_block())),
                ),
            ),
    )
    .with_min_items(1)
}

fn expand_time_of_day(plan: &Plan) -> Result<Option<TimeOfDay>, ProviderError> {
    let Some(at) = plan.single_block("schedule_at")? else {
        return Ok(None);
    };
    Ok(Some(TimeOfDay {
        hours: at.optional_i32("hours")?,
        minutes: at.optional_i32("minutes")?,
        timezone: at.optional_string("timezone"),
    }))
}

fn expand_schedule(plan: &Plan) -> Result<Option<BackupSchedule>, ProviderError> {
    let Some(schedule) = plan.single_block("schedule")? else {
        return Ok(None);
    };
    let mut out = BackupSchedule {
        schedule_type: schedule.required_string("schedule_type")?,
        hourly: None,
        daily: None,
        monthly: None,
    };
    if let Some(hourly) = schedule.single_block("hourly")? {
        out.hourly = Some(HourlySchedule {
            schedule_every_interval_hours: hourly.optional_i32("schedule_every_interval_hours")?,
        });
    }
    if let Some(daily) = schedule.single_block("daily")? {
        out.daily = Some(DailySchedule {
            monday: daily.optional_bool("monday"),
            tuesday: daily.optional_bool("tuesday"),
            wednesday: daily.optional_bool("wednesday"),
            thursday: daily.optional_bool("thursday"),
            friday: daily.optional_bool("friday"),
            saturday: daily.optional_bool("saturday"),
            sunday: daily.optional_bool("sunday"),
            schedule_at: expand_time_of_day(&daily)?,
        });
    }
    if let Some(monthly) = schedule.single_block("monthly")? {
        out.monthly = Some(MonthlySchedule {
            day_of_month: monthly.optional_i32("day_of_month")?,
            schedule_at: expand_time_of_day(&monthly)?,
        });
    }
    Ok(Some(out))
}

fn time_of_day_attrs(at: &TimeOfDay) -> AttrMap {
    Flat::new()
        .i64("hours", i64::from(at.hours))
        .i64("minutes", i64::from(at.minutes))
        .str("timezone", at.timezone.clone())
        .build()
}

fn flatten_schedule(schedule: &BackupSchedule) -> AttrMap {
    let mut flat = Flat::new().str("schedule_type", schedule.schedule_type.clone());
    if let Some(hourly) = &schedule.hourly {
        flat = flat.single_block(
            "hourly",
            Flat::new()
                .i64(
                    "schedule_every_interval_hours",
                    i64::from(hourly.schedule_every_interval_hours),
                )
                .build(),
        );
    }
    if let Some(daily) = &schedule.daily {
        let mut inner = Flat::new()
            .bool("monday", daily.monday)
            .bool("tuesday", daily.tuesday)
            .bool("wednesday", daily.wednesday)
            .bool("thursday", daily.thursday)
            .bool("friday", daily.friday)
            .bool("saturday", daily.saturday)
            .bool("sunday", daily.sunday);
        if let Some(at) = &daily.schedule_at {
            inner = inner.single_block("schedule_at", time_of_day_attrs(at));
        }
        flat = flat.single_block("daily", inner.build());
    }
    if let Some(monthly) = &schedule.monthly {
        let mut inner = Flat::new().i64("day_of_month", i64::from(monthly.day_of_month));
        if let Some(at) = &monthly.schedule_at {
            inner = inner.single_block("schedule_at", time_of_day_attrs(at));
        }
        flat = flat.single_block("monthly", inner.build());
    }
    flat.build()
}

#[async_trait]
impl ResourceKind for BackupPolicyKind {
    type Record = BackupPolicy;

    fn name(&self) -> &'static str {
        "oasis_backup_policy"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute("deployment_id", Attribute::required_string().force_new())
            .with_attribute("is_paused", Attribute::optional_bool())
            .with_attribute("upload", Attribute::optional_bool())
            .with_attribute(
                "retention_period",
                Attribute::optional_int64().with_diff_suppress(DiffSuppress::ZeroSentinel),
            )
            .with_attribute("email_notification", Attribute::optional_string())
            .with_attribute("locked", Attribute::optional_bool())
            .with_attribute("created_at", Attribute::computed_string())
            .with_block("schedule", schedule_block())
    }

    fn expand(&self, _ctx: &Context, plan: &Plan) -> Result<BackupPolicy, ProviderError> {
        Ok(BackupPolicy {
            id: String::new(),
            name: plan.required_string("name")?,
            description: plan.optional_string("description"),
            deployment_id: plan.required_string("deployment_id")?,
            is_paused: plan.optional_bool("is_paused"),
            upload: plan.optional_bool("upload"),
            retention_period: duration_from_days(plan.optional_i64("retention_period")),
            email_notification: plan.optional_string("email_notification"),
            schedule: expand_schedule(plan)?,
            created_at: None,
            locked: plan.optional_bool("locked"),
        })
    }

    fn flatten(&self, policy: &BackupPolicy) -> AttrMap {
        let flat = Flat::new()
            .str("id", policy.id.clone())
            .str("name", policy.name.clone())
            .str("description", policy.description.clone())
            .str("deployment_id", policy.deployment_id.clone())
            .bool("is_paused", policy.is_paused)
            .bool("upload", policy.upload)
            .i64(
                "retention_period",
                days_from_duration(policy.retention_period.as_ref()),
            )
            .str("email_notification", policy.email_notification.clone())
            .bool("locked", policy.locked)
            .timestamp("created_at", policy.created_at.as_ref());
        match &policy.schedule {
            Some(schedule) => flat
                .single_block("schedule", flatten_schedule(schedule))
                .build(),
            None => flat.build(),
        }
    }

    async fn remote_create(
        &self,
        ctx: &Context,
        record: BackupPolicy,
    ) -> Result<String, ProviderError> {
        Ok(ctx.api().create_backup_policy(record).await?.id)
    }

    async fn remote_get(&self, ctx: &Context, id: &str) -> Result<BackupPolicy, ProviderError> {
        ctx.api().get_backup_policy(id).await
    }

    fn apply_changes(
        &self,
        current: &mut BackupPolicy,
        plan: &Plan,
        changes: &ChangeSet,
    ) -> Result<(), ProviderError> {
        if changes.has("name") {
            current.name = plan.required_string("name")?;
        }
        if changes.has("description") {
            current.description = plan.optional_string("description");
        }
        if changes.has("is_paused") {
            current.is_paused = plan.optional_bool("is_paused");
        }
        if changes.has("upload") {
            current.upload = plan.optional_bool("upload");
        }
        if changes.has("retention_period") {
            current.retention_period = duration_from_days(plan.optional_i64("retention_period"));
        }
        if changes.has("email_notification") {
            current.email_notification = plan.optional_string("email_notification");
        }
        if changes.has("locked") {
            current.locked = plan.optional_bool("locked");
        }
        if changes.has("schedule") {
            current.schedule = expand_schedule(plan)?;
        }
        Ok(())
    }

    async fn remote_update(
        &self,
        ctx: &Context,
        record: BackupPolicy,
    ) -> Result<(), ProviderError> {
        ctx.api().update_backup_policy(record).await
    }

    async fn remote_delete(&self, ctx: &Context, id: &str) -> Result<(), ProviderError> {
        ctx.api().delete_backup_policy(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{Lifecycle, Reconciler};
    use crate::testing::MockPlatform;
    use serde_json::json;
    use std::sync::Arc;

    fn ctx() -> Context {
        Context::new(Arc::new(MockPlatform::new()), "org-1", "proj-1")
    }

    fn plan(v: serde_json::Value) -> Plan {
        Plan::new(v).unwrap()
    }

    #[tokio::test]
    async fn test_retention_round_trips_in_days() {
        let reconciler = Reconciler::new(BackupPolicyKind);
        let ctx = ctx();

        let created = reconciler
            .create(
                &ctx,
                &plan(json!({
                    "name": "nightly",
                    "deployment_id": "dep-1",
                    "retention_period": 200,
                    "schedule": [{"schedule_type": "Daily"}],
                })),
            )
            .await
            .unwrap();
        assert_eq!(created.get("retention_period"), Some(&json!(200)));
    }

    #[test]
    fn test_daily_schedule_round_trip() {
        let ctx = Context::new(Arc::new(MockPlatform::new()), "org-1", "proj-1");
        let schedule = json!([{
            "schedule_type": "Daily",
            "daily": [{
                "monday": true,
                "tuesday": false,
                "wednesday": false,
                "thursday": true,
                "friday": false,
                "saturday": false,
                "sunday": false,
                "schedule_at": [{"hours": 10, "minutes": 10, "timezone": "UTC"}],
            }],
        }]);
        let policy = BackupPolicyKind
            .expand(
                &ctx,
                &plan(json!({
                    "name": "nightly",
                    "deployment_id": "dep-1",
                    "retention_period": 200,
                    "schedule": schedule.clone(),
                })),
            )
            .unwrap();

        assert_eq!(policy.retention_period.as_ref().unwrap().seconds, 200 * 24 * 3600);
        let daily = policy.schedule.as_ref().unwrap().daily.as_ref().unwrap();
        assert!(daily.monday && daily.thursday && !daily.friday);
        let at = daily.schedule_at.as_ref().unwrap();
        assert_eq!((at.hours, at.minutes, at.timezone.as_str()), (10, 10, "UTC"));

        // Flattening restores the planned schedule exactly, retention back
        // in days.
        let rendered = serde_json::Value::Object(BackupPolicyKind.flatten(&policy));
        assert_eq!(rendered["schedule"], schedule);
        assert_eq!(rendered["retention_period"], json!(200));
    }

    #[test]
    fn test_schedule_requires_type() {
        let ctx = Context::new(Arc::new(MockPlatform::new()), "org-1", "proj-1");
        let err = BackupPolicyKind
            .expand(
                &ctx,
                &plan(json!({
                    "name": "nightly",
                    "deployment_id": "dep-1",
                    "schedule": [{}],
                })),
            )
            .unwrap_err();
        match err {
            ProviderError::SchemaParse { field, .. } => {
                assert_eq!(field, "schedule.0.schedule_type")
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
