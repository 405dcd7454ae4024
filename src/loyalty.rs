//! Frequent flyer program
//!
//! Tier thresholds, membership numbers and the member record. Persistence
//! lives in [`crate::db`].

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A status tier and what it unlocks
#[derive(Debug, PartialEq, Eq)]
pub struct Tier {
    pub name: &'static str,
    pub credits_required: u32,
    pub oneworld: &'static str,
    pub color: u32,
    pub benefits: &'static [&'static str],
}

/// Tiers in ascending order of status credits
pub const TIERS: [Tier; 5] = [
    Tier {
        name: "Bronze",
        credits_required: 0,
        oneworld: "None",
        color: 0xCD_7F_32,
        benefits: &[
            "Earn Qantas Points",
            "Bonus Points on Qantas flights",
            "Access to Qantas Frequent Flyer partners",
        ],
    },
    Tier {
        name: "Silver",
        credits_required: 300,
        oneworld: "Ruby",
        color: 0xC0_C0_C0,
        benefits: &[
            "Priority check-in",
            "Priority boarding",
            "Extra baggage allowance",
            "Oneworld Ruby benefits",
            "Lounge access when flying internationally",
        ],
    },
    Tier {
        name: "Gold",
        credits_required: 700,
        oneworld: "Sapphire",
        color: 0xFF_D7_00,
        benefits: &[
            "Qantas Club lounge access",
            "Priority boarding and baggage handling",
            "Increased baggage allowance",
            "Oneworld Sapphire benefits",
            "Complimentary upgrades (subject to availability)",
        ],
    },
    Tier {
        name: "Platinum",
        credits_required: 1400,
        oneworld: "Emerald",
        color: 0xE5_E4_E2,
        benefits: &[
            "Qantas First Lounge access",
            "Premium boarding",
            "Extra baggage allowance",
            "Oneworld Emerald benefits",
            "Complimentary Qantas Club membership",
            "Priority waitlist and standby",
        ],
    },
    Tier {
        name: "Platinum One",
        credits_required: 3600,
        oneworld: "Emerald",
        color: 0x1C_1C_1C,
        benefits: &[
            "All Platinum benefits",
            "Dedicated concierge service",
            "Enhanced upgrade priority",
            "Access to invitation-only events",
            "Platinum One status gift",
            "Extended status credits validity",
        ],
    },
];

/// Highest tier whose threshold `credits` meets
pub fn tier_for(credits: u32) -> &'static Tier {
    TIERS
        .iter()
        .rev()
        .find(|tier| credits >= tier.credits_required)
        .unwrap_or(&TIERS[0])
}

/// Look up a tier by display name; unknown names fall back to Bronze
pub fn tier_named(name: &str) -> &'static Tier {
    TIERS
        .iter()
        .find(|tier| tier.name == name)
        .unwrap_or(&TIERS[0])
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextTier {
    pub name: &'static str,
    pub credits_needed: u32,
    pub total_required: u32,
}

/// Progress towards the next tier; `None` once at the top
pub fn next_tier(credits: u32) -> Option<NextTier> {
    TIERS
        .iter()
        .find(|tier| credits < tier.credits_required)
        .map(|tier| NextTier {
            name: tier.name,
            credits_needed: tier.credits_required - credits,
            total_required: tier.credits_required,
        })
}

/// `QF` + last 8 digits of the unix timestamp + 4 random digits
pub fn generate_membership_number(now: DateTime<Utc>, rng: &mut impl Rng) -> String {
    let tail = now.timestamp().rem_euclid(100_000_000);
    format!("QF{tail:08}{:04}", rng.gen_range(0..10_000))
}

// ============================================================================
// Members and flights
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cabin {
    Economy,
    #[serde(rename = "Premium Economy")]
    PremiumEconomy,
    Business,
    First,
}

impl Cabin {
    pub const ALL: [Cabin; 4] = [
        Cabin::Economy,
        Cabin::PremiumEconomy,
        Cabin::Business,
        Cabin::First,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Cabin::Economy => "Economy",
            Cabin::PremiumEconomy => "Premium Economy",
            Cabin::Business => "Business",
            Cabin::First => "First",
        }
    }
}

impl fmt::Display for Cabin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cabin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cabin::ALL
            .into_iter()
            .find(|cabin| cabin.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<_> = Cabin::ALL.into_iter().map(Cabin::as_str).collect();
                format!("Invalid cabin class. Choose from: {}", valid.join(", "))
            })
    }
}

/// A flight credited to a member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightRecord {
    pub flight_number: String,
    pub from: String,
    pub to: String,
    pub date: DateTime<Utc>,
    pub status_credits_earned: u32,
    pub qantas_points_earned: u64,
    pub cabin_class: Cabin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub user_id: String,
    pub roblox_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub membership_number: String,
    pub join_date: DateTime<Utc>,
    pub membership_year_start: DateTime<Utc>,
    pub qantas_points: u64,
    pub status_credits: u32,
    pub current_tier: String,
    pub oneworld_status: String,
    /// Oldest first
    pub flights: Vec<FlightRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn tier(&self) -> &'static Tier {
        tier_named(&self.current_tier)
    }

    /// Up to `limit` flights, newest first
    pub fn recent_flights(&self, limit: usize) -> Vec<&FlightRecord> {
        self.flights.iter().rev().take(limit).collect()
    }
}

/// Details supplied at signup
#[derive(Debug, Clone, Deserialize)]
pub struct NewMember {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// An admin's request to credit a flight
#[derive(Debug, Clone, Deserialize)]
pub struct FlightCredit {
    pub flight_number: String,
    pub from: String,
    pub to: String,
    pub status_credits: u32,
    pub points: u64,
    pub cabin: Cabin,
}

impl FlightCredit {
    pub fn into_record(self, date: DateTime<Utc>) -> FlightRecord {
        FlightRecord {
            flight_number: self.flight_number.to_uppercase(),
            from: self.from.to_uppercase(),
            to: self.to.to_uppercase(),
            date,
            status_credits_earned: self.status_credits,
            qantas_points_earned: self.points,
            cabin_class: self.cabin,
        }
    }
}

/// Outcome of crediting a flight
#[derive(Debug, Clone, Serialize)]
pub struct FlightAdded {
    pub member: Member,
    pub flight: FlightRecord,
    pub previous_credits: u32,
    pub previous_tier: String,
}

impl FlightAdded {
    pub fn upgraded(&self) -> bool {
        self.previous_tier != self.member.current_tier
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardSort {
    #[default]
    Credits,
    Points,
}

impl LeaderboardSort {
    /// Anything other than `points` sorts by status credits
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some(p) if p.eq_ignore_ascii_case("points") => LeaderboardSort::Points,
            _ => LeaderboardSort::Credits,
        }
    }
}
