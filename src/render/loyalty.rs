//! Frequent flyer cards

use super::{OutboundMessage, SUCCESS_COLOR};
use crate::loyalty::{next_tier, tier_for, FlightAdded, LeaderboardSort, Member};

const PROGRAM_COLOR: u32 = 0xE8_00_00;
const HISTORY_LIMIT: usize = 10;
const MEDALS: [&str; 3] = ["🥇", "🥈", "🥉"];

/// `12840` -> `12,840`
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

pub fn welcome(member: &Member) -> OutboundMessage {
    let tier = member.tier();
    let mut message = OutboundMessage::new(tier.color)
        .with_title("🎉 Welcome to Qantas Frequent Flyer!")
        .with_description(format!("Congratulations {}!", member.full_name()))
        .with_field("Membership Number", &member.membership_number, true)
        .with_field("Current Tier", &member.current_tier, true)
        .with_field("Status Credits", member.status_credits.to_string(), true)
        .with_field("Qantas Points", group_thousands(member.qantas_points), true)
        .with_field("Join Date", member.join_date.format("%Y-%m-%d").to_string(), true);

    if let Some(next) = next_tier(member.status_credits) {
        let oneworld = tier_for(next.total_required).oneworld;
        message = message.with_field(
            format!("Next Tier - {}", next.name),
            format!(
                "Earn {} Status Credits to unlock {} tier and oneworld {oneworld} status!",
                next.credits_needed, next.name
            ),
            false,
        );
    }
    message.with_footer("Check your account status anytime")
}

pub fn status(member: &Member) -> OutboundMessage {
    let tier = member.tier();
    let mut message = OutboundMessage::new(tier.color)
        .with_title(format!("✈️ {} - Qantas Frequent Flyer", member.full_name()))
        .with_field("Membership Number", &member.membership_number, true)
        .with_field("Current Tier", &member.current_tier, true)
        .with_field("oneworld Status", &member.oneworld_status, true)
        .with_field("Status Credits", member.status_credits.to_string(), true)
        .with_field("Qantas Points", group_thousands(member.qantas_points), true)
        .with_field("Flights Taken", member.flights.len().to_string(), true);

    message = match next_tier(member.status_credits) {
        Some(next) => message.with_field(
            format!("📈 Progress to {}", next.name),
            format!(
                "{} more Status Credits needed ({}/{})",
                next.credits_needed, member.status_credits, next.total_required
            ),
            false,
        ),
        None => message.with_field(
            "🏆 Top Tier Achieved!",
            "You have reached Platinum One - the highest tier!",
            false,
        ),
    };

    let benefits: Vec<String> = tier.benefits.iter().map(|b| format!("• {b}")).collect();
    message = message.with_field("🎁 Your Benefits", benefits.join("\n"), false);

    if let Some(roblox_id) = &member.roblox_id {
        message = message.with_field("🎮 Linked Accounts", format!("Roblox ID: {roblox_id}"), false);
    }

    message.with_footer(format!(
        "Member since {} | Membership Year: {}",
        member.join_date.format("%Y-%m-%d"),
        member.membership_year_start.format("%Y-%m-%d")
    ))
}

pub fn roblox_linked(roblox_id: &str) -> OutboundMessage {
    OutboundMessage::new(SUCCESS_COLOR).with_description(format!(
        "✅ Successfully linked Roblox ID: {roblox_id} to your account!"
    ))
}

pub fn flight_added(added: &FlightAdded) -> OutboundMessage {
    let member = &added.member;
    let flight = &added.flight;
    let color = if added.upgraded() {
        member.tier().color
    } else {
        SUCCESS_COLOR
    };

    let message = OutboundMessage::new(color)
        .with_title("✅ Flight Added Successfully")
        .with_field("Member", member.full_name(), true)
        .with_field(
            "Flight",
            format!("{} ({} → {})", flight.flight_number, flight.from, flight.to),
            true,
        )
        .with_field("Cabin", flight.cabin_class.as_str(), true)
        .with_field("Status Credits Earned", flight.status_credits_earned.to_string(), true)
        .with_field("Points Earned", group_thousands(flight.qantas_points_earned), true)
        .with_field(
            "Total Status Credits",
            format!("{} → {}", added.previous_credits, member.status_credits),
            true,
        )
        .with_field("Total Points", group_thousands(member.qantas_points), true)
        .with_field("Current Tier", &member.current_tier, true);

    if !added.upgraded() {
        return message;
    }
    message.with_field(
        "🎉 TIER UPGRADE!",
        format!(
            "Congratulations! {} has been upgraded from {} to **{}**!",
            member.first_name, added.previous_tier, member.current_tier
        ),
        false,
    )
}

/// The ten most recent flights, newest first
pub fn history(member: &Member) -> OutboundMessage {
    if member.flights.is_empty() {
        return OutboundMessage::new(member.tier().color)
            .with_description("✈️ You haven't taken any flights yet!");
    }

    let recent = member.recent_flights(HISTORY_LIMIT);
    let mut message = OutboundMessage::new(member.tier().color)
        .with_title(format!("✈️ Flight History - {}", member.full_name()))
        .with_description(format!(
            "Showing {} most recent flight(s)",
            recent.len()
        ));

    for flight in recent {
        message = message.with_field(
            format!("{} - {} → {}", flight.flight_number, flight.from, flight.to),
            format!(
                "Date: {}\nCabin: {}\nStatus Credits: {} | Points: {}",
                flight.date.format("%Y-%m-%d"),
                flight.cabin_class,
                flight.status_credits_earned,
                group_thousands(flight.qantas_points_earned)
            ),
            false,
        );
    }
    message.with_footer(format!("Total Flights: {}", member.flights.len()))
}

pub fn leaderboard(members: &[Member], sort: LeaderboardSort) -> OutboundMessage {
    if members.is_empty() {
        return OutboundMessage::new(PROGRAM_COLOR).with_description("📊 No members registered yet!");
    }

    let metric = match sort {
        LeaderboardSort::Credits => "Status Credits",
        LeaderboardSort::Points => "Qantas Points",
    };
    let mut message = OutboundMessage::new(PROGRAM_COLOR)
        .with_title("🏆 Qantas Frequent Flyer Leaderboard")
        .with_description(format!("Top {} members by {metric}", members.len()));

    for (index, member) in members.iter().enumerate() {
        let rank = MEDALS
            .get(index)
            .map_or_else(|| format!("{}.", index + 1), |medal| (*medal).to_string());
        let value = match sort {
            LeaderboardSort::Credits => format!("{} status credits", member.status_credits),
            LeaderboardSort::Points => format!("{} points", group_thousands(member.qantas_points)),
        };
        message = message.with_field(
            format!("{rank} {}", member.full_name()),
            format!("{} | {value}", member.current_tier),
            false,
        );
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loyalty::{Cabin, FlightRecord};
    use chrono::{TimeZone, Utc};

    fn member(credits: u32, points: u64) -> Member {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let tier = tier_for(credits);
        Member {
            user_id: "user-1".to_string(),
            roblox_id: None,
            first_name: "John".to_string(),
            last_name: "Smith".to_string(),
            email: "john@example.com".to_string(),
            membership_number: "QF723232000042".to_string(),
            join_date: at,
            membership_year_start: at,
            qantas_points: points,
            status_credits: credits,
            current_tier: tier.name.to_string(),
            oneworld_status: tier.oneworld.to_string(),
            flights: vec![],
            created_at: at,
            updated_at: at,
        }
    }

    fn flight(number: usize) -> FlightRecord {
        FlightRecord {
            flight_number: format!("QF{number}"),
            from: "SYD".to_string(),
            to: "MEL".to_string(),
            date: Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap(),
            status_credits_earned: 20,
            qantas_points_earned: 1_200,
            cabin_class: Cabin::Economy,
        }
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(12_840), "12,840");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn test_welcome_points_at_silver() {
        let message = welcome(&member(0, 0));
        let next = message.fields.last().unwrap();
        assert_eq!(next.name, "Next Tier - Silver");
        assert!(next.value.contains("300 Status Credits"));
        assert!(next.value.contains("oneworld Ruby"));
    }

    #[test]
    fn test_status_progress_and_top_tier() {
        let message = status(&member(250, 0));
        assert!(message
            .fields
            .iter()
            .any(|f| f.name == "📈 Progress to Silver" && f.value == "50 more Status Credits needed (250/300)"));

        let top = status(&member(3600, 0));
        assert!(top.fields.iter().any(|f| f.name == "🏆 Top Tier Achieved!"));
        assert_eq!(top.color, 0x1C1C1C);
    }

    #[test]
    fn test_history_caps_at_ten_newest_first() {
        let mut member = member(0, 0);
        member.flights = (1..=12).map(flight).collect();

        let message = history(&member);
        assert_eq!(message.fields.len(), 10);
        assert!(message.fields[0].name.starts_with("QF12 "));
        assert_eq!(message.footer.as_deref(), Some("Total Flights: 12"));
    }

    #[test]
    fn test_leaderboard_medals() {
        let members: Vec<Member> = (0..4).map(|i| member(400 - i * 100, 0)).collect();
        let message = leaderboard(&members, LeaderboardSort::Credits);
        assert!(message.fields[0].name.starts_with("🥇"));
        assert!(message.fields[2].name.starts_with("🥉"));
        assert!(message.fields[3].name.starts_with("4."));
        assert_eq!(message.fields[0].value, "Silver | 400 status credits");
    }
}
