//! Database module for the frequent flyer program
//!
//! Provides persistence for loyalty members and their flight history.

mod schema;

use schema::{MEMBER_COLUMNS, SCHEMA};

use crate::loyalty::{
    generate_membership_number, tier_for, FlightAdded, FlightCredit, FlightRecord,
    LeaderboardSort, Member, NewMember,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Stored flight history is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("Member not found: {0}")]
    MemberNotFound(String),
    #[error("Already registered: {0}")]
    AlreadyRegistered(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Member Operations ====================

    /// Register a new member at Bronze with no credits
    pub fn create_member(
        &self,
        user_id: &str,
        details: &NewMember,
        now: DateTime<Utc>,
    ) -> DbResult<Member> {
        let conn = self.conn.lock().unwrap();
        if find_member(&conn, user_id)?.is_some() {
            return Err(DbError::AlreadyRegistered(user_id.to_string()));
        }

        let bronze = tier_for(0);
        let member = Member {
            user_id: user_id.to_string(),
            roblox_id: None,
            first_name: details.first_name.clone(),
            last_name: details.last_name.clone(),
            email: details.email.to_lowercase(),
            membership_number: generate_membership_number(now, &mut rand::thread_rng()),
            join_date: now,
            membership_year_start: now,
            qantas_points: 0,
            status_credits: 0,
            current_tier: bronze.name.to_string(),
            oneworld_status: bronze.oneworld.to_string(),
            flights: vec![],
            created_at: now,
            updated_at: now,
        };

        conn.execute(
            &format!(
                "INSERT INTO members ({MEMBER_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
            ),
            params![
                member.user_id,
                member.roblox_id,
                member.first_name,
                member.last_name,
                member.email,
                member.membership_number,
                member.join_date.to_rfc3339(),
                member.membership_year_start.to_rfc3339(),
                points_to_sql(member.qantas_points),
                member.status_credits,
                member.current_tier,
                member.oneworld_status,
                serde_json::to_string(&member.flights)?,
                member.created_at.to_rfc3339(),
                member.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(member)
    }

    /// Get member by user ID
    pub fn get_member(&self, user_id: &str) -> DbResult<Member> {
        let conn = self.conn.lock().unwrap();
        find_member(&conn, user_id)?.ok_or_else(|| DbError::MemberNotFound(user_id.to_string()))
    }

    pub fn link_roblox(&self, user_id: &str, roblox_id: &str, now: DateTime<Utc>) -> DbResult<Member> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE members SET roblox_id = ?1, updated_at = ?2 WHERE user_id = ?3",
            params![roblox_id, now.to_rfc3339(), user_id],
        )?;
        if updated == 0 {
            return Err(DbError::MemberNotFound(user_id.to_string()));
        }
        find_member(&conn, user_id)?.ok_or_else(|| DbError::MemberNotFound(user_id.to_string()))
    }

    /// Credit a flight, accumulate credits and points, and recompute the tier
    pub fn record_flight(
        &self,
        user_id: &str,
        credit: FlightCredit,
        now: DateTime<Utc>,
    ) -> DbResult<FlightAdded> {
        let conn = self.conn.lock().unwrap();
        let mut member = find_member(&conn, user_id)?
            .ok_or_else(|| DbError::MemberNotFound(user_id.to_string()))?;

        let previous_credits = member.status_credits;
        let previous_tier = member.current_tier.clone();
        let flight = credit.into_record(now);

        member.status_credits = member
            .status_credits
            .saturating_add(flight.status_credits_earned);
        member.qantas_points = member
            .qantas_points
            .saturating_add(flight.qantas_points_earned);
        let tier = tier_for(member.status_credits);
        member.current_tier = tier.name.to_string();
        member.oneworld_status = tier.oneworld.to_string();
        member.flights.push(flight.clone());
        member.updated_at = now;

        conn.execute(
            "UPDATE members
             SET status_credits = ?1, qantas_points = ?2, current_tier = ?3,
                 oneworld_status = ?4, flights = ?5, updated_at = ?6
             WHERE user_id = ?7",
            params![
                member.status_credits,
                points_to_sql(member.qantas_points),
                member.current_tier,
                member.oneworld_status,
                serde_json::to_string(&member.flights)?,
                now.to_rfc3339(),
                user_id,
            ],
        )?;

        if previous_tier != member.current_tier {
            tracing::info!(
                user_id = %user_id,
                from = %previous_tier,
                to = %member.current_tier,
                "Member tier upgraded"
            );
        }

        Ok(FlightAdded {
            member,
            flight,
            previous_credits,
            previous_tier,
        })
    }

    /// Top members by status credits or points
    pub fn leaderboard(&self, sort: LeaderboardSort, limit: usize) -> DbResult<Vec<Member>> {
        let conn = self.conn.lock().unwrap();
        let order = match sort {
            LeaderboardSort::Credits => "status_credits DESC, qantas_points DESC",
            LeaderboardSort::Points => "qantas_points DESC, status_credits DESC",
        };
        let mut stmt = conn.prepare(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members ORDER BY {order}, join_date ASC LIMIT ?1"
        ))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], parse_member_row)?;
        rows.map(|row| row?.into_member()).collect()
    }
}

fn find_member(conn: &Connection, user_id: &str) -> DbResult<Option<Member>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MEMBER_COLUMNS} FROM members WHERE user_id = ?1"
    ))?;
    stmt.query_row(params![user_id], parse_member_row)
        .optional()?
        .map(MemberRow::into_member)
        .transpose()
}

/// A member row before its flight history is decoded
struct MemberRow {
    member: Member,
    flights_json: String,
}

impl MemberRow {
    fn into_member(self) -> DbResult<Member> {
        let flights: Vec<FlightRecord> = serde_json::from_str(&self.flights_json)?;
        Ok(Member {
            flights,
            ..self.member
        })
    }
}

/// Parse a member row from the database
fn parse_member_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MemberRow> {
    Ok(MemberRow {
        member: Member {
            user_id: row.get(0)?,
            roblox_id: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            email: row.get(4)?,
            membership_number: row.get(5)?,
            join_date: parse_datetime(&row.get::<_, String>(6)?),
            membership_year_start: parse_datetime(&row.get::<_, String>(7)?),
            qantas_points: points_from_sql(row.get(8)?),
            status_credits: row.get(9)?,
            current_tier: row.get(10)?,
            oneworld_status: row.get(11)?,
            flights: vec![],
            created_at: parse_datetime(&row.get::<_, String>(13)?),
            updated_at: parse_datetime(&row.get::<_, String>(14)?),
        },
        flights_json: row.get(12)?,
    })
}

fn points_to_sql(points: u64) -> i64 {
    i64::try_from(points).unwrap_or(i64::MAX)
}

fn points_from_sql(points: i64) -> u64 {
    u64::try_from(points).unwrap_or(0)
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
