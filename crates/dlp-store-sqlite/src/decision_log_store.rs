// crates/dlp-store-sqlite/src/decision_log_store.rs
// ============================================================================
// Module: SQLite Decision Log Store
// Description: Durable, batched DecisionLog implementation backed by SQLite WAL.
// Purpose: Append-only audit trail with batched writes, query, stats, export, and retention.
// Dependencies: dlp-core, rusqlite, serde_json
// ============================================================================

//! ## Overview
//! [`SqliteDecisionLog`] buffers incoming records in memory and flushes them
//! to `SQLite` as a single transaction once `batch_size` is reached or
//! [`DecisionLog::flush`]/[`DecisionLog::close`] is called explicitly. The
//! pending buffer is left intact on a failed flush so a caller can retry
//! without losing records.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Mutex;

use dlp_core::Action;
use dlp_core::Classification;
use dlp_core::DecisionLog;
use dlp_core::DecisionLogFilter;
use dlp_core::DecisionLogId;
use dlp_core::DecisionLogRecord;
use dlp_core::DecisionLogStats;
use dlp_core::DecisionType;
use dlp_core::Destination;
use dlp_core::LogError;
use dlp_core::OrderByField;
use dlp_core::QuarantineId;
use dlp_core::RequestId;
use dlp_core::SanitizedFlag;
use dlp_core::SessionKey;
use dlp_core::SortDirection;
use dlp_core::Timestamp;
use dlp_core::Verdict;
use rusqlite::Connection;
use rusqlite::Row;
use rusqlite::params;

use crate::schema;

/// Default number of pending records flushed automatically.
const DEFAULT_BATCH_SIZE: usize = 100;

/// `SQLite`-backed [`DecisionLog`].
pub struct SqliteDecisionLog {
    connection: Mutex<Connection>,
    pending: Mutex<Vec<DecisionLogRecord>>,
    batch_size: usize,
}

impl SqliteDecisionLog {
    /// Opens (creating if absent) the database at `path` and bootstraps its schema.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Schema`] when the database cannot be opened or its
    /// schema cannot be initialized.
    pub fn open(path: &Path) -> Result<Self, LogError> {
        Self::open_with_batch_size(path, DEFAULT_BATCH_SIZE)
    }

    /// Opens the store with an explicit auto-flush batch size.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Schema`] when the database cannot be opened or its
    /// schema cannot be initialized.
    pub fn open_with_batch_size(path: &Path, batch_size: usize) -> Result<Self, LogError> {
        let connection = schema::open_and_initialize(path).map_err(|err| LogError::Schema(err.to_string()))?;
        Ok(Self { connection: Mutex::new(connection), pending: Mutex::new(Vec::new()), batch_size })
    }

    fn flush_locked(&self, conn: &mut Connection, pending: &mut Vec<DecisionLogRecord>) -> Result<(), LogError> {
        if pending.is_empty() {
            return Ok(());
        }
        let tx = conn.transaction().map_err(|err| LogError::Write(err.to_string()))?;
        for record in pending.iter() {
            insert_record(&tx, record).map_err(|err| LogError::Write(err.to_string()))?;
        }
        tx.commit().map_err(|err| LogError::Write(err.to_string()))?;
        pending.clear();
        Ok(())
    }
}

impl DecisionLog for SqliteDecisionLog {
    fn record(&self, record: DecisionLogRecord) -> Result<(), LogError> {
        let mut pending = self.pending.lock().map_err(|_| LogError::Write("pending buffer poisoned".into()))?;
        pending.push(record);
        if pending.len() >= self.batch_size {
            let mut conn = self.connection.lock().map_err(|_| LogError::Write("connection mutex poisoned".into()))?;
            self.flush_locked(&mut conn, &mut pending)?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), LogError> {
        let mut pending = self.pending.lock().map_err(|_| LogError::Write("pending buffer poisoned".into()))?;
        let mut conn = self.connection.lock().map_err(|_| LogError::Write("connection mutex poisoned".into()))?;
        self.flush_locked(&mut conn, &mut pending)
    }

    fn close(&self) -> Result<(), LogError> {
        self.flush()?;
        self.record(DecisionLogRecord::new(DecisionType::SystemShutdown, Timestamp::now()))?;
        self.flush()
    }

    fn query(&self, filter: DecisionLogFilter) -> Result<Vec<DecisionLogRecord>, LogError> {
        let conn = self.connection.lock().map_err(|_| LogError::Query("connection mutex poisoned".into()))?;
        let (where_clause, values) = build_where(&filter);
        let order_field = match filter.order_by.unwrap_or(OrderByField::Timestamp) {
            OrderByField::Timestamp => "timestamp",
            OrderByField::Type => "decision_type",
            OrderByField::Action => "action",
        };
        let order_dir = match filter.order_direction.unwrap_or(SortDirection::Desc) {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        let limit = filter.limit.unwrap_or(1000);
        let offset = filter.offset.unwrap_or(0);
        let sql = format!(
            "SELECT id, decision_type, timestamp, request_id, session_key, action, verdict, destination,
                target, content_hash, content_length, flag_count, highest_classification, duration_ms,
                operator, reason, previous_state, new_state, quarantine_id, flag_details, metadata
             FROM decision_log {where_clause}
             ORDER BY {order_field} {order_dir}
             LIMIT {limit} OFFSET {offset}"
        );
        let mut stmt = conn.prepare(&sql).map_err(|err| LogError::Query(err.to_string()))?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(std::convert::AsRef::as_ref).collect();
        let rows = stmt.query_map(param_refs.as_slice(), row_to_record).map_err(|err| LogError::Query(err.to_string()))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|err| LogError::Query(err.to_string()))?.map_err(LogError::Query)?);
        }
        Ok(out)
    }

    fn stats(&self, filter: DecisionLogFilter) -> Result<DecisionLogStats, LogError> {
        let conn = self.connection.lock().map_err(|_| LogError::Query("connection mutex poisoned".into()))?;
        let (where_clause, values) = build_where(&filter);
        let param_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(std::convert::AsRef::as_ref).collect();

        let total: i64 = conn
            .query_row(&format!("SELECT COUNT(1) FROM decision_log {where_clause}"), param_refs.as_slice(), |row| {
                row.get(0)
            })
            .map_err(|err| LogError::Query(err.to_string()))?;

        let by_type = group_counts(&conn, &where_clause, &param_refs, "decision_type", |raw| {
            decision_type_from_db(raw).map_err(LogError::Query)
        })?;
        let by_action = group_counts(&conn, &where_clause, &param_refs, "action", |raw| {
            action_from_db(raw).map_err(LogError::Query)
        })?;
        let by_verdict = group_counts(&conn, &where_clause, &param_refs, "verdict", |raw| {
            verdict_from_db(raw).map_err(LogError::Query)
        })?;
        let by_classification = group_counts(&conn, &where_clause, &param_refs, "highest_classification", |raw| {
            Classification::parse_normalized(raw).ok_or_else(|| LogError::Query(format!("corrupt classification: {raw}")))
        })?;

        let duration_clause = if where_clause.is_empty() {
            "WHERE duration_ms IS NOT NULL".to_string()
        } else {
            format!("{where_clause} AND duration_ms IS NOT NULL")
        };
        let average_duration_ms: Option<f64> = conn
            .query_row(
                &format!("SELECT AVG(duration_ms) FROM decision_log {duration_clause}"),
                param_refs.as_slice(),
                |row| row.get(0),
            )
            .map_err(|err| LogError::Query(err.to_string()))?;

        let min_timestamp: Option<i64> = conn
            .query_row(&format!("SELECT MIN(timestamp) FROM decision_log {where_clause}"), param_refs.as_slice(), |row| {
                row.get(0)
            })
            .map_err(|err| LogError::Query(err.to_string()))?;
        let max_timestamp: Option<i64> = conn
            .query_row(&format!("SELECT MAX(timestamp) FROM decision_log {where_clause}"), param_refs.as_slice(), |row| {
                row.get(0)
            })
            .map_err(|err| LogError::Query(err.to_string()))?;

        Ok(DecisionLogStats {
            total: u64::try_from(total).unwrap_or_default(),
            by_type,
            by_action,
            by_verdict,
            by_classification,
            average_duration_ms,
            min_timestamp: min_timestamp.map(Timestamp::from_unix_millis),
            max_timestamp: max_timestamp.map(Timestamp::from_unix_millis),
        })
    }

    fn export_to_file(&self, path: &std::path::Path, filter: DecisionLogFilter) -> Result<u64, LogError> {
        let records = self.query(filter).map_err(|err| LogError::File(err.to_string()))?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|err| LogError::File(err.to_string()))?;
        }
        let mut buffer = String::new();
        for record in &records {
            let line = serde_json::to_string(record).map_err(|err| LogError::File(err.to_string()))?;
            buffer.push_str(&line);
            buffer.push('\n');
        }
        std::fs::write(path, buffer).map_err(|err| LogError::File(err.to_string()))?;
        Ok(u64::try_from(records.len()).unwrap_or_default())
    }

    fn purge_old_entries(&self, retention_days: u32) -> Result<u64, LogError> {
        let conn = self.connection.lock().map_err(|_| LogError::Write("connection mutex poisoned".into()))?;
        let cutoff = Timestamp::now().as_unix_millis() - i64::from(retention_days) * 86_400_000;
        let changed = conn
            .execute("DELETE FROM decision_log WHERE timestamp < ?1", params![cutoff])
            .map_err(|err| LogError::Write(err.to_string()))?;
        Ok(u64::try_from(changed).unwrap_or_default())
    }
}

// ============================================================================
// SECTION: Wire Conversions
// ============================================================================

fn decision_type_to_db(value: DecisionType) -> &'static str {
    match value {
        DecisionType::OutboundScan => "outbound_scan",
        DecisionType::InboundInspect => "inbound_inspect",
        DecisionType::QuarantineCreated => "quarantine_created",
        DecisionType::QuarantineApproved => "quarantine_approved",
        DecisionType::QuarantineRejected => "quarantine_rejected",
        DecisionType::QuarantineExpired => "quarantine_expired",
        DecisionType::PostureChanged => "posture_changed",
        DecisionType::KillSwitchOn => "kill_switch_on",
        DecisionType::KillSwitchOff => "kill_switch_off",
        DecisionType::RegistryUpdated => "registry_updated",
        DecisionType::SystemStartup => "system_startup",
        DecisionType::SystemShutdown => "system_shutdown",
    }
}

fn decision_type_from_db(raw: &str) -> Result<DecisionType, String> {
    match raw {
        "outbound_scan" => Ok(DecisionType::OutboundScan),
        "inbound_inspect" => Ok(DecisionType::InboundInspect),
        "quarantine_created" => Ok(DecisionType::QuarantineCreated),
        "quarantine_approved" => Ok(DecisionType::QuarantineApproved),
        "quarantine_rejected" => Ok(DecisionType::QuarantineRejected),
        "quarantine_expired" => Ok(DecisionType::QuarantineExpired),
        "posture_changed" => Ok(DecisionType::PostureChanged),
        "kill_switch_on" => Ok(DecisionType::KillSwitchOn),
        "kill_switch_off" => Ok(DecisionType::KillSwitchOff),
        "registry_updated" => Ok(DecisionType::RegistryUpdated),
        "system_startup" => Ok(DecisionType::SystemStartup),
        "system_shutdown" => Ok(DecisionType::SystemShutdown),
        other => Err(format!("corrupt decision_type: {other}")),
    }
}

fn action_to_db(value: Action) -> &'static str {
    match value {
        Action::Allow => "allow",
        Action::Quarantine => "quarantine",
        Action::Block => "block",
    }
}

fn action_from_db(raw: &str) -> Result<Action, String> {
    match raw {
        "allow" => Ok(Action::Allow),
        "quarantine" => Ok(Action::Quarantine),
        "block" => Ok(Action::Block),
        other => Err(format!("corrupt action: {other}")),
    }
}

fn verdict_to_db(value: Verdict) -> &'static str {
    match value {
        Verdict::Clean => "clean",
        Verdict::Flagged => "flagged",
        Verdict::Error => "error",
    }
}

fn verdict_from_db(raw: &str) -> Result<Verdict, String> {
    match raw {
        "clean" => Ok(Verdict::Clean),
        "flagged" => Ok(Verdict::Flagged),
        "error" => Ok(Verdict::Error),
        other => Err(format!("corrupt verdict: {other}")),
    }
}

fn destination_to_db(value: Destination) -> &'static str {
    match value {
        Destination::Email => "email",
        Destination::Chat => "chat",
        Destination::Api => "api",
        Destination::File => "file",
        Destination::Clipboard => "clipboard",
        Destination::Browser => "browser",
        Destination::Unknown => "unknown",
    }
}

fn destination_from_db(raw: &str) -> Result<Destination, String> {
    match raw {
        "email" => Ok(Destination::Email),
        "chat" => Ok(Destination::Chat),
        "api" => Ok(Destination::Api),
        "file" => Ok(Destination::File),
        "clipboard" => Ok(Destination::Clipboard),
        "browser" => Ok(Destination::Browser),
        "unknown" => Ok(Destination::Unknown),
        other => Err(format!("corrupt destination: {other}")),
    }
}

fn insert_record(conn: &Connection, record: &DecisionLogRecord) -> rusqlite::Result<()> {
    let flag_details = record
        .flag_details
        .as_ref()
        .map(|flags| serde_json::to_string(flags).unwrap_or_else(|_| "[]".to_string()));
    let metadata = record.metadata.as_ref().map(|value| value.to_string());
    conn.execute(
        "INSERT INTO decision_log (
            decision_type, timestamp, request_id, session_key, action, verdict, destination, target,
            content_hash, content_length, flag_count, highest_classification, duration_ms, operator,
            reason, previous_state, new_state, quarantine_id, flag_details, metadata
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
        params![
            decision_type_to_db(record.decision_type),
            record.timestamp.as_unix_millis(),
            record.request_id.as_ref().map(RequestId::as_str),
            record.session_key.as_ref().map(SessionKey::as_str),
            record.action.map(action_to_db),
            record.verdict.map(verdict_to_db),
            record.destination.map(destination_to_db),
            record.target,
            record.content_hash,
            record.content_length.map(|len| i64::try_from(len).unwrap_or(i64::MAX)),
            record.flag_count.map(|len| i64::try_from(len).unwrap_or(i64::MAX)),
            record.highest_classification.map(Classification::as_str),
            record.duration_ms.map(|ms| i64::try_from(ms).unwrap_or(i64::MAX)),
            record.operator,
            record.reason,
            record.previous_state,
            record.new_state,
            record.quarantine_id.as_ref().map(QuarantineId::as_str),
            flag_details,
            metadata,
        ],
    )?;
    Ok(())
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<Result<DecisionLogRecord, String>> {
    let id: i64 = row.get(0)?;
    let decision_type: String = row.get(1)?;
    let request_id: Option<String> = row.get(3)?;
    let session_key: Option<String> = row.get(4)?;
    let action: Option<String> = row.get(5)?;
    let verdict: Option<String> = row.get(6)?;
    let destination: Option<String> = row.get(7)?;
    let highest_classification: Option<String> = row.get(12)?;
    let quarantine_id: Option<String> = row.get(18)?;
    let flag_details: Option<String> = row.get(19)?;
    let metadata: Option<String> = row.get(20)?;
    let timestamp_raw: i64 = row.get(2)?;
    let target: Option<String> = row.get(8)?;
    let content_hash: Option<String> = row.get(9)?;
    let content_length_raw: Option<i64> = row.get(10)?;
    let flag_count_raw: Option<i64> = row.get(11)?;
    let duration_ms_raw: Option<i64> = row.get(13)?;
    let operator: Option<String> = row.get(14)?;
    let reason: Option<String> = row.get(15)?;
    let previous_state: Option<String> = row.get(16)?;
    let new_state: Option<String> = row.get(17)?;
    let built = (|| {
        Ok(DecisionLogRecord {
            id: DecisionLogId::from_raw(u64::try_from(id).unwrap_or_default()),
            decision_type: decision_type_from_db(&decision_type)?,
            timestamp: Timestamp::from_unix_millis(timestamp_raw),
            request_id: request_id.map(RequestId::new),
            session_key: session_key.map(SessionKey::new),
            action: action.as_deref().map(action_from_db).transpose()?,
            verdict: verdict.as_deref().map(verdict_from_db).transpose()?,
            destination: destination.as_deref().map(destination_from_db).transpose()?,
            target,
            content_hash,
            content_length: content_length_raw.map(|len| usize::try_from(len).unwrap_or_default()),
            flag_count: flag_count_raw.map(|len| usize::try_from(len).unwrap_or_default()),
            highest_classification: highest_classification
                .as_deref()
                .map(|raw| Classification::parse_normalized(raw).ok_or_else(|| format!("corrupt classification: {raw}")))
                .transpose()?,
            duration_ms: duration_ms_raw.map(|ms| u64::try_from(ms).unwrap_or_default()),
            operator,
            reason,
            previous_state,
            new_state,
            quarantine_id: quarantine_id.map(QuarantineId::new),
            flag_details: flag_details
                .map(|raw| serde_json::from_str::<Vec<SanitizedFlag>>(&raw).map_err(|err| err.to_string()))
                .transpose()?,
            metadata: metadata
                .map(|raw| serde_json::from_str::<serde_json::Value>(&raw).map_err(|err| err.to_string()))
                .transpose()?,
        })
    })();
    Ok(built)
}

fn build_where(filter: &DecisionLogFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(decision_type) = filter.decision_type {
        clauses.push(format!("decision_type = ?{}", values.len() + 1));
        values.push(Box::new(decision_type_to_db(decision_type)));
    }
    if let Some(types) = &filter.decision_types
        && !types.is_empty()
    {
        let placeholders: Vec<String> = types
            .iter()
            .map(|ty| {
                values.push(Box::new(decision_type_to_db(*ty)));
                format!("?{}", values.len())
            })
            .collect();
        clauses.push(format!("decision_type IN ({})", placeholders.join(", ")));
    }
    if let Some(action) = filter.action {
        clauses.push(format!("action = ?{}", values.len() + 1));
        values.push(Box::new(action_to_db(action)));
    }
    if let Some(verdict) = filter.verdict {
        clauses.push(format!("verdict = ?{}", values.len() + 1));
        values.push(Box::new(verdict_to_db(verdict)));
    }
    if let Some(destination) = filter.destination {
        clauses.push(format!("destination = ?{}", values.len() + 1));
        values.push(Box::new(destination_to_db(destination)));
    }
    if let Some(classification) = filter.classification {
        clauses.push(format!("highest_classification = ?{}", values.len() + 1));
        values.push(Box::new(classification.as_str()));
    }
    if let Some(operator) = &filter.operator {
        clauses.push(format!("operator = ?{}", values.len() + 1));
        values.push(Box::new(operator.clone()));
    }
    if let Some(start_time) = filter.start_time {
        clauses.push(format!("timestamp >= ?{}", values.len() + 1));
        values.push(Box::new(start_time.as_unix_millis()));
    }
    if let Some(end_time) = filter.end_time {
        clauses.push(format!("timestamp <= ?{}", values.len() + 1));
        values.push(Box::new(end_time.as_unix_millis()));
    }
    if let Some(session_key) = &filter.session_key {
        clauses.push(format!("session_key = ?{}", values.len() + 1));
        values.push(Box::new(session_key.as_str().to_string()));
    }
    if let Some(request_id) = &filter.request_id {
        clauses.push(format!("request_id = ?{}", values.len() + 1));
        values.push(Box::new(request_id.as_str().to_string()));
    }

    let where_clause = if clauses.is_empty() { String::new() } else { format!("WHERE {}", clauses.join(" AND ")) };
    (where_clause, values)
}

fn group_counts<T>(
    conn: &Connection,
    where_clause: &str,
    param_refs: &[&dyn rusqlite::ToSql],
    column: &str,
    parse: impl Fn(&str) -> Result<T, LogError>,
) -> Result<Vec<(T, u64)>, LogError> {
    let clause_with_not_null = if where_clause.is_empty() {
        format!("WHERE {column} IS NOT NULL")
    } else {
        format!("{where_clause} AND {column} IS NOT NULL")
    };
    let sql = format!("SELECT {column}, COUNT(1) FROM decision_log {clause_with_not_null} GROUP BY {column}");
    let mut stmt = conn.prepare(&sql).map_err(|err| LogError::Query(err.to_string()))?;
    let rows = stmt
        .query_map(param_refs, |row| {
            let raw: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((raw, count))
        })
        .map_err(|err| LogError::Query(err.to_string()))?;
    let mut out = Vec::new();
    for row in rows {
        let (raw, count) = row.map_err(|err| LogError::Query(err.to_string()))?;
        out.push((parse(&raw)?, u64::try_from(count).unwrap_or_default()));
    }
    Ok(out)
}
