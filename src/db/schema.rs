//! Database schema

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS members (
    user_id TEXT PRIMARY KEY,
    roblox_id TEXT,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT NOT NULL,
    membership_number TEXT NOT NULL UNIQUE,
    join_date TEXT NOT NULL,
    membership_year_start TEXT NOT NULL,
    qantas_points INTEGER NOT NULL DEFAULT 0,
    status_credits INTEGER NOT NULL DEFAULT 0,
    current_tier TEXT NOT NULL DEFAULT 'Bronze',
    oneworld_status TEXT NOT NULL DEFAULT 'None',
    flights TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_members_credits ON members(status_credits DESC);
CREATE INDEX IF NOT EXISTS idx_members_points ON members(qantas_points DESC);
";

/// Column list shared by every member query, in `parse_member_row` order
pub const MEMBER_COLUMNS: &str = "user_id, roblox_id, first_name, last_name, email, \
     membership_number, join_date, membership_year_start, qantas_points, status_credits, \
     current_tier, oneworld_status, flights, created_at, updated_at";
