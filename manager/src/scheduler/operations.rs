// File: manager/src/scheduler/operations.rs
use crate::config::ChainshotSchedule;
use crate::services::fleet_service::timestamped_name;
use crate::services::FleetService;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, instrument, warn};

pub struct ChainshotScheduler {
    service: Arc<FleetService>,
    schedules: Vec<ChainshotSchedule>,
    scheduler: JobScheduler,
}

impl ChainshotScheduler {
    pub async fn new(service: Arc<FleetService>, schedules: Vec<ChainshotSchedule>) -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| anyhow!("Failed to create JobScheduler: {}", e))?;

        Ok(Self {
            service,
            schedules,
            scheduler,
        })
    }

    /// Register every configured schedule and start the scheduler. Returns
    /// the number of jobs scheduled.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<usize> {
        info!("Starting chainshot scheduler with 6-field cron format (sec min hour day month dow)");
        let mut scheduled_count = 0;

        for schedule in &self.schedules {
            match self.schedule_chainshot_job(schedule).await {
                Ok(()) => {
                    scheduled_count += 1;
                    info!(
                        "Scheduled chainshot of {}: {}",
                        schedule.chain, schedule.schedule
                    );
                }
                Err(e) => error!(
                    "Failed to schedule chainshot of {}: {} (schedule: {})",
                    schedule.chain, e, schedule.schedule
                ),
            }
        }

        if scheduled_count > 0 {
            self.scheduler
                .start()
                .await
                .map_err(|e| anyhow!("Failed to start scheduler: {}", e))?;
            info!("Chainshot scheduler started with {} jobs", scheduled_count);
        } else {
            warn!("No chainshot schedules configured - scheduler not started");
        }

        Ok(scheduled_count)
    }

    async fn schedule_chainshot_job(&self, schedule: &ChainshotSchedule) -> Result<()> {
        validate_6_field_cron(&schedule.schedule)
            .map_err(|e| anyhow!("Invalid 6-field cron schedule '{}': {}", schedule.schedule, e))?;

        let service = self.service.clone();
        let chain_name = schedule.chain.clone();
        let prefix = schedule
            .name_prefix
            .clone()
            .unwrap_or_else(|| schedule.chain.clone());

        let job = Job::new_async(schedule.schedule.as_str(), move |_uuid, _scheduler| {
            let service = service.clone();
            let chain_name = chain_name.clone();
            let chainshot_name = timestamped_name(&prefix);

            Box::pin(async move {
                info!(
                    "Executing scheduled chainshot {} of {}",
                    chainshot_name, chain_name
                );
                match service
                    .start_chainshot(&chain_name, Some(chainshot_name))
                    .await
                {
                    Ok(operation_id) => info!(
                        "Scheduled chainshot of {} started (operation_id: {})",
                        chain_name, operation_id
                    ),
                    Err(e) => error!("Scheduled chainshot of {} not started: {:#}", chain_name, e),
                }
            })
        })
        .map_err(|e| anyhow!("Failed to create chainshot job for '{}': {}", schedule.schedule, e))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| anyhow!("Failed to add chainshot job to scheduler: {}", e))?;

        Ok(())
    }
}

pub fn validate_6_field_cron(schedule: &str) -> Result<()> {
    let parts: Vec<&str> = schedule.split_whitespace().collect();

    if parts.len() != 6 {
        return Err(anyhow!(
            "tokio-cron-scheduler requires exactly 6 fields: second minute hour day month dayofweek. Got {} fields: '{}'",
            parts.len(),
            schedule
        ));
    }

    validate_cron_field(parts[0], "second", 0, 59)?;
    validate_cron_field(parts[1], "minute", 0, 59)?;
    validate_cron_field(parts[2], "hour", 0, 23)?;
    validate_cron_field(parts[3], "day", 1, 31)?;
    validate_cron_field(parts[4], "month", 1, 12)?;
    validate_cron_field(parts[5], "dayofweek", 0, 7)?;
    Ok(())
}

fn validate_cron_field(field: &str, name: &str, min: u32, max: u32) -> Result<()> {
    if field == "*" || field == "?" {
        return Ok(());
    }

    let in_range = |value: u32| -> Result<()> {
        if value < min || value > max {
            return Err(anyhow!(
                "{} value {} is outside valid range {}-{}",
                name,
                value,
                min,
                max
            ));
        }
        Ok(())
    };
    let parse = |part: &str| -> Result<u32> {
        part.parse::<u32>()
            .map_err(|_| anyhow!("Invalid {} value: {}", name, part))
    };

    if let Some(step) = field.strip_prefix("*/") {
        if parse(step)? == 0 {
            return Err(anyhow!("{} step value cannot be 0", name));
        }
        return Ok(());
    }

    for part in field.split(',') {
        match part.split_once('-') {
            Some((start, end)) => {
                in_range(parse(start)?)?;
                in_range(parse(end)?)?;
            }
            None => in_range(parse(part)?)?,
        }
    }
    Ok(())
}
