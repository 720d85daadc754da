//! Seed data
//!
//! The state table starts from this field until the live feed replaces it.
//! The top three cars carry a telemetry snapshot so the fallback simulator
//! has something to animate.

use super::{Driver, Race, SectorTimes, Standing, Team, Telemetry, TyreCompound, LEADER_GAP};

fn team(id: &str, name: &str, color: &str) -> Team {
    Team {
        id: id.to_string(),
        name: name.to_string(),
        color: color.to_string(),
    }
}

fn driver(id: &str, name: &str, number: u32, team: &str, country: &str) -> Driver {
    Driver {
        id: id.to_string(),
        name: name.to_string(),
        number,
        team: team.to_string(),
        country: country.to_string(),
        photo: None,
    }
}

/// The ten constructors
pub fn teams() -> Vec<Team> {
    vec![
        team("red-bull", "Red Bull Racing", "#3671C6"),
        team("mclaren", "McLaren", "#FF8000"),
        team("ferrari", "Ferrari", "#E8002D"),
        team("mercedes", "Mercedes", "#27F4D2"),
        team("aston-martin", "Aston Martin", "#229971"),
        team("alpine", "Alpine", "#FF87BC"),
        team("williams", "Williams", "#64C4FF"),
        team("rb", "RB", "#6692FF"),
        team("kick-sauber", "Kick Sauber", "#52E252"),
        team("haas", "Haas F1 Team", "#B6BABD"),
    ]
}

/// The ten tracked drivers, in championship order
pub fn drivers() -> Vec<Driver> {
    vec![
        driver("VER", "Max Verstappen", 1, "red-bull", "NED"),
        driver("NOR", "Lando Norris", 4, "mclaren", "GBR"),
        driver("LEC", "Charles Leclerc", 16, "ferrari", "MON"),
        driver("PIA", "Oscar Piastri", 81, "mclaren", "AUS"),
        driver("HAM", "Lewis Hamilton", 44, "ferrari", "GBR"),
        driver("RUS", "George Russell", 63, "mercedes", "GBR"),
        driver("SAI", "Carlos Sainz", 55, "williams", "ESP"),
        driver("ALO", "Fernando Alonso", 14, "aston-martin", "ESP"),
        driver("STR", "Lance Stroll", 18, "aston-martin", "CAN"),
        driver("GAS", "Pierre Gasly", 10, "alpine", "FRA"),
    ]
}

/// Standings seeded from the driver list
pub fn standings() -> Vec<Standing> {
    // (points, wins, last lap, gap, fastest)
    let rows: [(u32, u32, &str, &str, bool); 10] = [
        (161, 4, "1:31.045", LEADER_GAP, false),
        (138, 2, "1:31.198", "+0.153", false),
        (128, 2, "1:30.917", "+0.402", true),
        (112, 1, "1:31.334", "+0.712", false),
        (105, 1, "1:31.501", "+1.045", false),
        (90, 1, "1:31.622", "+1.203", false),
        (55, 0, "1:31.789", "+1.567", false),
        (42, 0, "1:31.901", "+1.890", false),
        (20, 0, "1:32.045", "+2.101", false),
        (15, 0, "1:32.200", "+2.334", false),
    ];
    let teams = teams();

    drivers()
        .into_iter()
        .zip(rows)
        .enumerate()
        .map(|(i, (driver, (points, wins, lap, gap, fastest)))| {
            let team = teams
                .iter()
                .find(|t| t.id == driver.team)
                .cloned()
                .unwrap_or_else(|| Team::from_name(&driver.team, None));
            let delta = gap.trim_start_matches('+').parse::<f64>().unwrap_or(0.0);

            let mut standing = Standing::new(i as u32 + 1, driver, team);
            standing.points = points;
            standing.wins = wins;
            standing.last_lap_time = Some(lap.to_string());
            standing.gap = Some(gap.to_string());
            standing.is_fastest_lap = fastest;
            standing.tyre = Some(TyreCompound::Medium);
            standing.sectors = SectorTimes::default();
            if i < 3 {
                standing.telemetry = Some(Telemetry {
                    speed: 298.0 - i as f64 * 4.0,
                    rpm: 11_400,
                    gear: 7,
                    throttle: 96.0,
                    brake: 0.0,
                    drs: i > 0,
                    delta,
                });
            }
            standing
        })
        .collect()
}

/// Calendar rounds
pub fn races() -> Vec<Race> {
    let rows = [
        ("bahrain", "Bahrain Grand Prix", "Bahrain International Circuit", "Bahrain", "02 Mar 2025"),
        ("jeddah", "Saudi Arabian Grand Prix", "Jeddah Corniche Circuit", "Saudi Arabia", "09 Mar 2025"),
        ("australia", "Australian Grand Prix", "Albert Park Circuit", "Australia", "23 Mar 2025"),
        ("japan", "Japanese Grand Prix", "Suzuka International Racing Course", "Japan", "06 Apr 2025"),
        ("china", "Chinese Grand Prix", "Shanghai International Circuit", "China", "20 Apr 2025"),
        ("miami", "Miami Grand Prix", "Miami International Autodrome", "USA", "04 May 2025"),
        ("monaco", "Monaco Grand Prix", "Circuit de Monaco", "Monaco", "25 May 2025"),
        ("spain", "Spanish Grand Prix", "Circuit de Barcelona-Catalunya", "Spain", "01 Jun 2025"),
    ];

    rows.iter()
        .enumerate()
        .map(|(i, (id, name, circuit, country, date))| Race {
            id: id.to_string(),
            name: name.to_string(),
            circuit: circuit.to_string(),
            country: country.to_string(),
            date: date.to_string(),
            round: i as u32 + 1,
        })
        .collect()
}
