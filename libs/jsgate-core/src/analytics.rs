//! Access analytics.
//!
//! Writes go through [`AccessRecorder`], which swallows storage failures.
//! Reads are computed on demand from a snapshot of log entries; nothing is
//! maintained incrementally.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;
use tracing::error;

use crate::model::{AccessLogEntry, NewAccessLog, PopunderCampaign, Script};
use crate::repo::AccessLogRepo;

pub const DEFAULT_TOP_DOMAINS: usize = 10;

#[derive(Clone)]
pub struct AccessRecorder {
    logs: Arc<dyn AccessLogRepo>,
}

impl AccessRecorder {
    pub fn new(logs: Arc<dyn AccessLogRepo>) -> Self {
        Self { logs }
    }

    /// Appends one entry. Failures are logged and dropped.
    pub async fn record(&self, entry: NewAccessLog) {
        let project_id = entry.project_id;
        if let Err(e) = self.logs.append(entry).await {
            error!("Failed to log access for project {}: {:#}", project_id, e);
        }
    }

    /// Records in a background task so the caller never waits on storage.
    pub fn spawn_record(&self, entry: NewAccessLog) {
        let recorder = self.clone();
        tokio::spawn(async move {
            recorder.record(entry).await;
        });
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub total: u64,
    pub allowed: u64,
    pub denied: u64,
}

impl Tally {
    fn add(&mut self, allowed: bool) {
        self.total += 1;
        if allowed {
            self.allowed += 1;
        } else {
            self.denied += 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub counts: Tally,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainStat {
    pub domain: String,
    #[serde(flatten)]
    pub counts: Tally,
}

/// A domain that was refused at least once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeniedDomain {
    pub domain: String,
    pub requests: u64,
    pub total: u64,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefererStat {
    pub referer_url: String,
    pub domain: Option<String>,
    #[serde(flatten)]
    pub counts: Tally,
    pub last_access: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptStat {
    pub script_id: Option<i64>,
    pub script_name: Option<String>,
    pub script_url: Option<String>,
    #[serde(flatten)]
    pub counts: Tally,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignStat {
    pub campaign_id: i64,
    pub campaign_name: String,
    pub campaign_url: String,
    #[serde(flatten)]
    pub counts: Tally,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixCell {
    pub script_id: Option<i64>,
    pub script_name: Option<String>,
    pub domain: String,
    #[serde(flatten)]
    pub counts: Tally,
    pub last_access: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    pub top_domains: usize,
    /// Restrict the daily series to the last N calendar days.
    pub days: Option<u32>,
    pub now: DateTime<Utc>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            top_domains: DEFAULT_TOP_DOMAINS,
            days: None,
            now: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub summary: Tally,
    pub daily: Vec<DailyBucket>,
    pub top_domains: Vec<DomainStat>,
    pub blacklisted_domains: Vec<DeniedDomain>,
    pub referer_urls: Vec<RefererStat>,
    pub by_script: Vec<ScriptStat>,
    pub by_campaign: Vec<CampaignStat>,
    pub matrix: Vec<MatrixCell>,
}

impl AnalyticsReport {
    pub fn build(
        entries: &[AccessLogEntry],
        scripts: &[Script],
        campaigns: &[PopunderCampaign],
        project_slug: &str,
        opts: ReportOptions,
    ) -> Self {
        Self {
            summary: summarize(entries),
            daily: daily_series(entries, opts.days, opts.now),
            top_domains: top_domains(entries, opts.top_domains),
            blacklisted_domains: blacklisted_domains(entries),
            referer_urls: referer_urls(entries),
            by_script: by_script(entries, scripts, project_slug),
            by_campaign: by_campaign(entries, campaigns, project_slug),
            matrix: access_matrix(entries, scripts),
        }
    }
}

pub fn summarize(entries: &[AccessLogEntry]) -> Tally {
    let mut tally = Tally::default();
    for e in entries {
        tally.add(e.allowed);
    }
    tally
}

/// UTC calendar-day buckets, oldest first.
pub fn daily_series(
    entries: &[AccessLogEntry],
    days: Option<u32>,
    now: DateTime<Utc>,
) -> Vec<DailyBucket> {
    let since = days.and_then(|d| {
        now.date_naive()
            .checked_sub_days(Days::new(u64::from(d.saturating_sub(1))))
    });

    let mut buckets: BTreeMap<NaiveDate, Tally> = BTreeMap::new();
    for e in entries {
        let date = e.created_at.date_naive();
        if since.is_some_and(|s| date < s) {
            continue;
        }
        buckets.entry(date).or_default().add(e.allowed);
    }

    buckets
        .into_iter()
        .map(|(date, counts)| DailyBucket { date, counts })
        .collect()
}

fn domain_of(e: &AccessLogEntry) -> Option<&str> {
    e.domain.as_deref().filter(|d| !d.is_empty())
}

/// Domains ranked by request count, ties broken alphabetically.
pub fn top_domains(entries: &[AccessLogEntry], limit: usize) -> Vec<DomainStat> {
    let mut by_domain: HashMap<&str, Tally> = HashMap::new();
    for e in entries {
        if let Some(domain) = domain_of(e) {
            by_domain.entry(domain).or_default().add(e.allowed);
        }
    }

    let mut stats: Vec<DomainStat> = by_domain
        .into_iter()
        .map(|(domain, counts)| DomainStat {
            domain: domain.to_string(),
            counts,
        })
        .collect();
    stats.sort_by(|a, b| {
        b.counts
            .total
            .cmp(&a.counts.total)
            .then_with(|| a.domain.cmp(&b.domain))
    });
    stats.truncate(limit);
    stats
}

/// Domains with at least one denied request, most recently seen first.
pub fn blacklisted_domains(entries: &[AccessLogEntry]) -> Vec<DeniedDomain> {
    let mut by_domain: HashMap<&str, (Tally, DateTime<Utc>)> = HashMap::new();
    for e in entries {
        if let Some(domain) = domain_of(e) {
            let slot = by_domain
                .entry(domain)
                .or_insert_with(|| (Tally::default(), e.created_at));
            slot.0.add(e.allowed);
            if !e.allowed && (slot.0.denied == 1 || e.created_at > slot.1) {
                slot.1 = e.created_at;
            }
        }
    }

    let mut denied: Vec<DeniedDomain> = by_domain
        .into_iter()
        .filter(|(_, (tally, _))| tally.denied > 0)
        .map(|(domain, (tally, last_seen))| DeniedDomain {
            domain: domain.to_string(),
            requests: tally.denied,
            total: tally.total,
            last_seen,
        })
        .collect();
    denied.sort_by(|a, b| {
        b.last_seen
            .cmp(&a.last_seen)
            .then_with(|| a.domain.cmp(&b.domain))
    });
    denied
}

/// Full referer URLs, so separate pages of one domain stay distinct.
pub fn referer_urls(entries: &[AccessLogEntry]) -> Vec<RefererStat> {
    let mut by_url: HashMap<&str, RefererStat> = HashMap::new();
    for e in entries {
        let Some(url) = e.referer_url.as_deref().filter(|u| !u.is_empty()) else {
            continue;
        };
        let stat = by_url.entry(url).or_insert_with(|| RefererStat {
            referer_url: url.to_string(),
            domain: e.domain.clone(),
            counts: Tally::default(),
            last_access: e.created_at,
        });
        stat.counts.add(e.allowed);
        stat.last_access = stat.last_access.max(e.created_at);
    }

    let mut stats: Vec<RefererStat> = by_url.into_values().collect();
    stats.sort_by(|a, b| {
        b.counts
            .total
            .cmp(&a.counts.total)
            .then_with(|| a.referer_url.cmp(&b.referer_url))
    });
    stats
}

fn is_campaign(e: &AccessLogEntry) -> bool {
    e.campaign_id.is_some()
}

/// Per-script counts. Every known script gets a row, even without traffic;
/// script requests that never resolved a script are grouped under
/// `script_id: None`. Campaign traffic is left to [`by_campaign`].
pub fn by_script(
    entries: &[AccessLogEntry],
    scripts: &[Script],
    project_slug: &str,
) -> Vec<ScriptStat> {
    let mut tallies: HashMap<Option<i64>, Tally> = HashMap::new();
    for e in entries.iter().filter(|e| !is_campaign(e)) {
        tallies.entry(e.script_id).or_default().add(e.allowed);
    }

    let mut stats: Vec<ScriptStat> = scripts
        .iter()
        .map(|s| ScriptStat {
            script_id: Some(s.id),
            script_name: Some(s.name.clone()),
            script_url: Some(s.public_url(project_slug)),
            counts: tallies.remove(&Some(s.id)).unwrap_or_default(),
        })
        .collect();

    // Entries whose script has since been deleted, or never resolved.
    let mut orphans: Vec<ScriptStat> = tallies
        .into_iter()
        .map(|(script_id, counts)| ScriptStat {
            script_id,
            script_name: None,
            script_url: None,
            counts,
        })
        .collect();
    orphans.sort_by_key(|s| s.script_id);
    stats.extend(orphans);
    stats
}

/// Per-campaign counts for the given campaigns, in their order.
pub fn by_campaign(
    entries: &[AccessLogEntry],
    campaigns: &[PopunderCampaign],
    project_slug: &str,
) -> Vec<CampaignStat> {
    let mut tallies: HashMap<i64, Tally> = HashMap::new();
    for e in entries {
        if let Some(id) = e.campaign_id {
            tallies.entry(id).or_default().add(e.allowed);
        }
    }

    campaigns
        .iter()
        .map(|c| CampaignStat {
            campaign_id: c.id,
            campaign_name: c.name.clone(),
            campaign_url: c.public_url(project_slug),
            counts: tallies.remove(&c.id).unwrap_or_default(),
        })
        .collect()
}

/// (script, domain) cells, busiest first.
pub fn access_matrix(entries: &[AccessLogEntry], scripts: &[Script]) -> Vec<MatrixCell> {
    let names: HashMap<i64, &str> = scripts.iter().map(|s| (s.id, s.name.as_str())).collect();

    let mut cells: HashMap<(Option<i64>, &str), (Tally, DateTime<Utc>)> = HashMap::new();
    for e in entries.iter().filter(|e| !is_campaign(e)) {
        let Some(domain) = domain_of(e) else {
            continue;
        };
        let cell = cells
            .entry((e.script_id, domain))
            .or_insert_with(|| (Tally::default(), e.created_at));
        cell.0.add(e.allowed);
        cell.1 = cell.1.max(e.created_at);
    }

    let mut matrix: Vec<MatrixCell> = cells
        .into_iter()
        .map(|((script_id, domain), (counts, last_access))| MatrixCell {
            script_id,
            script_name: script_id.and_then(|id| names.get(&id)).map(|n| n.to_string()),
            domain: domain.to_string(),
            counts,
            last_access,
        })
        .collect();
    matrix.sort_by(|a, b| {
        b.counts
            .total
            .cmp(&a.counts.total)
            .then_with(|| a.script_id.cmp(&b.script_id))
            .then_with(|| a.domain.cmp(&b.domain))
    });
    matrix
}
