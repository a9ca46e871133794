//! End-to-end scheduler runs on virtual time.
//!
//! Wires the real jobs and application handlers to the in-memory
//! adapters and a manual clock, then drives every run through the
//! scheduler's lease path with `run_job_once`.

use std::sync::Arc;
use std::time::Duration;

use homeport_billing::adapters::clock::ManualClock;
use homeport_billing::adapters::gateway::MockPaymentGateway;
use homeport_billing::adapters::memory::{
    InMemoryHistoryLogger, InMemoryLeaseStore, InMemoryPremiumStore,
    InMemorySubscriptionRepository,
};
use homeport_billing::application::handlers::billing::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, ChargeSubscriptionHandler,
    ConfirmBillingCommand, ConfirmBillingHandler, EndFreeTrialHandler, ExpireGracePeriodHandler,
    IssueBillingKeyCommand, IssueBillingKeyHandler, ResumeSubscriptionCommand,
    ResumeSubscriptionHandler, StartFreeTrialCommand, StartFreeTrialHandler,
};
use homeport_billing::domain::billing::{
    find_plan, HistoryEventKind, ProjectedStatus, StandardPricing, Subscription,
    SubscriptionStatus, PREMIUM_PLAN,
};
use homeport_billing::domain::foundation::{CustomerId, PlanId, SubscriptionId, Timestamp};
use homeport_billing::ports::{Clock, GatewayError, LeaseStore, PremiumStateStore, SubscriptionRepository};
use homeport_billing::scheduler::{
    BillingJob, GraceSweepJob, RenewalJob, RetryJob, Scheduler, SchedulerConfig, TrialSweepJob,
};

fn ts(s: &str) -> Timestamp {
    Timestamp::parse_rfc3339(s).unwrap()
}

fn customer(id: &str) -> CustomerId {
    CustomerId::new(id).unwrap()
}

/// Everything a scenario needs: adapters, handlers, jobs, and the
/// scheduler that drives them.
struct World {
    repo: Arc<InMemorySubscriptionRepository>,
    gateway: Arc<MockPaymentGateway>,
    premium: Arc<InMemoryPremiumStore>,
    history: Arc<InMemoryHistoryLogger>,
    clock: Arc<ManualClock>,
    leases: Arc<InMemoryLeaseStore>,
    scheduler: Scheduler,
    renewal: Arc<dyn BillingJob>,
    retry: Arc<dyn BillingJob>,
    grace_sweep: Arc<dyn BillingJob>,
    trial_sweep: Arc<dyn BillingJob>,
}

impl World {
    fn new(start: &str) -> Self {
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        let gateway = Arc::new(MockPaymentGateway::new());
        let premium = Arc::new(InMemoryPremiumStore::new());
        let history = Arc::new(InMemoryHistoryLogger::new());
        let clock = Arc::new(ManualClock::new(ts(start)));
        let leases = Arc::new(InMemoryLeaseStore::new(clock.clone()));

        let charge = Arc::new(ChargeSubscriptionHandler::new(
            repo.clone(),
            gateway.clone(),
            premium.clone(),
            history.clone(),
            Arc::new(StandardPricing),
            clock.clone(),
        ));
        let expire = Arc::new(ExpireGracePeriodHandler::new(
            repo.clone(),
            premium.clone(),
            history.clone(),
            clock.clone(),
        ));
        let end_trial = Arc::new(EndFreeTrialHandler::new(
            repo.clone(),
            premium.clone(),
            history.clone(),
            clock.clone(),
        ));

        let renewal: Arc<dyn BillingJob> =
            Arc::new(RenewalJob::new(repo.clone(), charge.clone()));
        let retry: Arc<dyn BillingJob> = Arc::new(RetryJob::new(repo.clone(), charge));
        let grace_sweep: Arc<dyn BillingJob> =
            Arc::new(GraceSweepJob::new(repo.clone(), expire));
        let trial_sweep: Arc<dyn BillingJob> =
            Arc::new(TrialSweepJob::new(premium.clone(), end_trial));

        let scheduler = Scheduler::new(
            clock.clone(),
            leases.clone(),
            SchedulerConfig {
                holder: "test-instance".into(),
                lease_ttl: Duration::from_secs(60),
            },
        );

        Self {
            repo,
            gateway,
            premium,
            history,
            clock,
            leases,
            scheduler,
            renewal,
            retry,
            grace_sweep,
            trial_sweep,
        }
    }

    async fn issue_key(&self, cust: &str) {
        IssueBillingKeyHandler::new(
            self.repo.clone(),
            self.gateway.clone(),
            self.history.clone(),
            self.clock.clone(),
        )
        .handle(IssueBillingKeyCommand {
            customer_id: customer(cust),
            authorization_code: "auth_abc".into(),
        })
        .await
        .unwrap();
    }

    async fn confirm(&self, cust: &str) {
        let charge = Arc::new(ChargeSubscriptionHandler::new(
            self.repo.clone(),
            self.gateway.clone(),
            self.premium.clone(),
            self.history.clone(),
            Arc::new(StandardPricing),
            self.clock.clone(),
        ));
        ConfirmBillingHandler::new(self.repo.clone(), self.history.clone(), charge, self.clock.clone())
            .handle(ConfirmBillingCommand {
                customer_id: customer(cust),
                customer_email: None,
                customer_name: None,
            })
            .await
            .unwrap();
    }

    async fn cancel(&self, cust: &str) {
        CancelSubscriptionHandler::new(
            self.repo.clone(),
            self.premium.clone(),
            self.history.clone(),
            self.clock.clone(),
        )
        .handle(CancelSubscriptionCommand {
            customer_id: customer(cust),
        })
        .await
        .unwrap();
    }

    async fn resume(&self, cust: &str) {
        ResumeSubscriptionHandler::new(
            self.repo.clone(),
            self.premium.clone(),
            self.history.clone(),
            self.clock.clone(),
        )
        .handle(ResumeSubscriptionCommand {
            customer_id: customer(cust),
        })
        .await
        .unwrap();
    }

    async fn start_trial(&self, cust: &str) {
        StartFreeTrialHandler::new(
            self.repo.clone(),
            self.premium.clone(),
            self.history.clone(),
            self.clock.clone(),
        )
        .handle(StartFreeTrialCommand {
            customer_id: customer(cust),
        })
        .await
        .unwrap();
    }

    async fn subscription_of(&self, cust: &str) -> homeport_billing::domain::billing::Subscription {
        self.repo
            .all()
            .into_iter()
            .find(|s| s.customer_id == customer(cust))
            .unwrap()
    }
}

#[tokio::test]
async fn renewal_run_charges_due_subscription_through_the_lease() {
    let world = World::new("2024-01-10T00:00:00Z");
    world.issue_key("cust-1").await;
    world.confirm("cust-1").await;

    world.clock.set(ts("2024-02-10T00:00:00Z"));
    let report = world
        .scheduler
        .run_job_once(&world.renewal)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(report.succeeded, 1);
    assert_eq!(world.gateway.charges().len(), 2);

    let sub = world.subscription_of("cust-1").await;
    assert_eq!(sub.next_billing_date, ts("2024-03-10T00:00:00Z"));
    assert_eq!(sub.last_payment_date, Some(ts("2024-02-10T00:00:00Z")));
    assert!(world.premium.projection(&customer("cust-1")).unwrap().is_premium);
}

#[tokio::test]
async fn renewal_run_is_skipped_while_another_holder_has_the_lease() {
    let world = World::new("2024-01-10T00:00:00Z");
    world.issue_key("cust-1").await;
    world.confirm("cust-1").await;
    world.clock.set(ts("2024-02-10T00:00:00Z"));

    world
        .leases
        .acquire("renewal-billing", "other-instance", Duration::from_secs(60))
        .await
        .unwrap();

    let outcome = world.scheduler.run_job_once(&world.renewal).await.unwrap();
    assert!(outcome.is_none());
    // Only the confirm-billing charge went out.
    assert_eq!(world.gateway.charges().len(), 1);
}

#[tokio::test]
async fn crashed_holder_lease_expires_and_the_run_proceeds() {
    let world = World::new("2024-01-10T00:00:00Z");
    world.issue_key("cust-1").await;
    world.confirm("cust-1").await;
    world.clock.set(ts("2024-02-10T00:00:00Z"));

    world
        .leases
        .acquire("renewal-billing", "crashed-instance", Duration::from_secs(60))
        .await
        .unwrap();
    world.clock.advance_hours(1);

    let report = world.scheduler.run_job_once(&world.renewal).await.unwrap();
    assert_eq!(report.unwrap().succeeded, 1);
}

#[tokio::test]
async fn renewal_batch_continues_past_a_record_without_a_credential() {
    let world = World::new("2024-01-10T00:00:00Z");
    world.issue_key("cust-ok").await;
    world.confirm("cust-ok").await;

    // Subscription record exists but no billing key was ever issued.
    let plan = find_plan(&PlanId::new(PREMIUM_PLAN).unwrap()).unwrap();
    let broken = Subscription::create(
        SubscriptionId::new(),
        customer("cust-broken"),
        plan,
        ts("2024-01-10T00:00:00Z"),
    );
    world.repo.save(&broken).await.unwrap();
    world.clock.set(ts("2024-02-10T00:00:00Z"));

    let report = world
        .scheduler
        .run_job_once(&world.renewal)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    let renewed = world.subscription_of("cust-ok").await;
    assert_eq!(renewed.status, SubscriptionStatus::Active);
    assert_eq!(renewed.next_billing_date, ts("2024-03-10T00:00:00Z"));
    assert_eq!(
        world.subscription_of("cust-broken").await.status,
        SubscriptionStatus::Suspended
    );
}

#[tokio::test]
async fn three_failed_renewals_suspend_and_exhaust_the_retry_budget() {
    let world = World::new("2024-01-10T00:00:00Z");
    world.issue_key("cust-1").await;
    world.confirm("cust-1").await;

    world.gateway.fail_charges_with(GatewayError::insufficient_balance("no funds"));
    world.clock.set(ts("2024-02-10T00:00:00Z"));

    // The due date never advances on failure, so each pass retries the
    // same record. A fresh instant per pass keeps the order ids unique.
    for _ in 0..3 {
        let report = world
            .scheduler
            .run_job_once(&world.renewal)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.failed, 1);
        world.clock.advance_hours(1);
    }

    let sub = world.subscription_of("cust-1").await;
    assert_eq!(sub.status, SubscriptionStatus::Suspended);
    assert_eq!(sub.retry_count, 3);
    // Access is not cut off yet; the projection mirrors the suspension.
    assert_eq!(
        world
            .premium
            .projection(&customer("cust-1"))
            .unwrap()
            .subscription_status,
        ProjectedStatus::Suspended
    );

    // Budget spent: neither the renewal nor the retry job touches it.
    world.clock.advance_days(2);
    let report = world
        .scheduler
        .run_job_once(&world.renewal)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.processed, 0);
    let report = world
        .scheduler
        .run_job_once(&world.retry)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.processed, 0);

    let kinds: Vec<_> = world.history.entries().iter().map(|e| e.kind).collect();
    assert_eq!(kinds.iter().filter(|k| **k == HistoryEventKind::PaymentFailed).count(), 3);
    assert!(kinds.contains(&HistoryEventKind::SubscriptionSuspended));
}

#[tokio::test]
async fn retry_job_revives_a_suspended_record_once_the_attempt_ages() {
    let world = World::new("2024-01-10T00:00:00Z");
    world.issue_key("cust-1").await;
    world.confirm("cust-1").await;

    // One failed renewal, then an administrative suspension.
    world.gateway.fail_charges_with(GatewayError::insufficient_balance("no funds"));
    world.clock.set(ts("2024-02-10T00:00:00Z"));
    world
        .scheduler
        .run_job_once(&world.renewal)
        .await
        .unwrap()
        .unwrap();
    let mut sub = world.subscription_of("cust-1").await;
    sub.suspend(world.clock.now()).unwrap();
    world.repo.update(&sub).await.unwrap();
    world.gateway.succeed_charges();

    // The last attempt is too fresh for the retry job.
    world.clock.advance_hours(2);
    let report = world
        .scheduler
        .run_job_once(&world.retry)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.processed, 0);

    world.clock.advance_hours(23);
    let report = world
        .scheduler
        .run_job_once(&world.retry)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.succeeded, 1);

    let revived = world.subscription_of("cust-1").await;
    assert_eq!(revived.status, SubscriptionStatus::Active);
    assert_eq!(revived.retry_count, 0);
    assert!(world.premium.projection(&customer("cust-1")).unwrap().is_premium);
}

#[tokio::test]
async fn grace_sweep_expires_a_cancelled_subscription_after_the_window() {
    let world = World::new("2024-01-10T00:00:00Z");
    world.issue_key("cust-1").await;
    world.confirm("cust-1").await;

    // Cancelled mid-cycle: premium runs until the paid period ends.
    world.clock.set(ts("2024-01-20T00:00:00Z"));
    world.cancel("cust-1").await;
    let sub = world.subscription_of("cust-1").await;
    assert_eq!(sub.status, SubscriptionStatus::Cancelled);
    assert_eq!(sub.grace_period_end_date, Some(ts("2024-02-10T00:00:00Z")));

    // Still inside the window: nothing to sweep.
    world.clock.set(ts("2024-02-10T00:00:00Z"));
    let report = world
        .scheduler
        .run_job_once(&world.grace_sweep)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.processed, 0);

    world.clock.advance_days(1);
    let report = world
        .scheduler
        .run_job_once(&world.grace_sweep)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.succeeded, 1);

    let expired = world.subscription_of("cust-1").await;
    assert_eq!(expired.status, SubscriptionStatus::Expired);
    assert!(!world.premium.projection(&customer("cust-1")).unwrap().is_premium);
    let kinds: Vec<_> = world.history.entries().iter().map(|e| e.kind).collect();
    assert!(kinds.contains(&HistoryEventKind::SubscriptionExpired));
}

#[tokio::test]
async fn trial_sweep_retires_the_trial_when_the_window_closes() {
    let world = World::new("2024-01-10T00:00:00Z");
    world.start_trial("cust-1").await;

    // Mid-trial: not a candidate yet.
    world.clock.set(ts("2024-01-25T00:00:00Z"));
    let report = world
        .scheduler
        .run_job_once(&world.trial_sweep)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.processed, 0);
    assert!(world.premium.projection(&customer("cust-1")).unwrap().is_premium);

    world.clock.set(ts("2024-02-10T00:00:00Z"));
    let report = world
        .scheduler
        .run_job_once(&world.trial_sweep)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.succeeded, 1);

    let ended = world.subscription_of("cust-1").await;
    assert_eq!(ended.status, SubscriptionStatus::Expired);
    assert!(!world.premium.projection(&customer("cust-1")).unwrap().is_premium);

    // The trial stays marked as used so it can never restart.
    let trial = world.premium.trial_state(&customer("cust-1")).await.unwrap();
    assert!(trial.used);

    // Idempotent: the next sweep finds nothing.
    let report = world
        .scheduler
        .run_job_once(&world.trial_sweep)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.processed, 0);
}

#[tokio::test]
async fn full_lifecycle_over_three_months_of_virtual_time() {
    let world = World::new("2024-01-10T00:00:00Z");
    world.issue_key("cust-1").await;
    world.confirm("cust-1").await;

    // First renewal, a month later.
    world.clock.set(ts("2024-02-10T00:00:00Z"));
    world
        .scheduler
        .run_job_once(&world.renewal)
        .await
        .unwrap()
        .unwrap();
    let sub = world.subscription_of("cust-1").await;
    assert_eq!(sub.next_billing_date, ts("2024-03-10T00:00:00Z"));

    // The card goes bad before the second renewal.
    world.gateway.fail_charges_with(GatewayError::insufficient_balance("no funds"));
    world.clock.set(ts("2024-03-10T00:00:00Z"));
    for _ in 0..3 {
        world
            .scheduler
            .run_job_once(&world.renewal)
            .await
            .unwrap()
            .unwrap();
        world.clock.advance_hours(1);
    }
    assert_eq!(
        world.subscription_of("cust-1").await.status,
        SubscriptionStatus::Suspended
    );

    // Customer fixes the card; support resumes the account and the next
    // renewal pass picks the still-due record up.
    world.gateway.succeed_charges();
    world.resume("cust-1").await;
    let report = world
        .scheduler
        .run_job_once(&world.renewal)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.succeeded, 1);

    let recovered = world.subscription_of("cust-1").await;
    assert_eq!(recovered.status, SubscriptionStatus::Active);
    assert_eq!(recovered.retry_count, 0);
    assert_eq!(recovered.next_billing_date, ts("2024-04-10T03:00:00Z"));
    assert!(world.premium.projection(&customer("cust-1")).unwrap().is_premium);

    let kinds: Vec<_> = world.history.entries().iter().map(|e| e.kind).collect();
    assert!(kinds.contains(&HistoryEventKind::BillingKeyIssued));
    assert!(kinds.contains(&HistoryEventKind::SubscriptionSuspended));
    assert!(kinds.contains(&HistoryEventKind::SubscriptionResumed));
    assert_eq!(
        kinds.iter().filter(|k| **k == HistoryEventKind::PaymentSuccess).count(),
        3
    );
}
