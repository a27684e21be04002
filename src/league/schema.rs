//! League schema: table definitions, seed dataset and bootstrap reporting

use super::records::{Branch, City, Coach, Livestream, Match, Player, Team, TvBroadcaster};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The table dropped and recreated on every bootstrap
pub const RECREATED_TABLE: &str = "branch";

pub const CREATE_BRANCH: &str = "CREATE TABLE branch (\
    branch_id INTEGER PRIMARY KEY, \
    branch_name VARCHAR(20) NOT NULL, \
    branch_addr VARCHAR(50) NOT NULL, \
    branch_city VARCHAR(20) NOT NULL, \
    branch_phone INTEGER)";

/// Tables created once, in foreign-key dependency order
pub const FIXED_TABLES: &[(&str, &str)] = &[
    (
        "TV",
        "CREATE TABLE TV (\
            bname VARCHAR(40), \
            country VARCHAR(40), \
            contact INTEGER NOT NULL, \
            channelnumber INTEGER NOT NULL, \
            PRIMARY KEY (bname, country), \
            UNIQUE (contact))",
    ),
    (
        "Cities",
        "CREATE TABLE Cities (\
            city VARCHAR(40), \
            country VARCHAR(40) NOT NULL, \
            PRIMARY KEY (city))",
    ),
    (
        "Coaches",
        "CREATE TABLE Coaches (\
            clicensenumber INTEGER, \
            cname VARCHAR(40) NOT NULL, \
            gender VARCHAR(10) NOT NULL, \
            age INTEGER, \
            PRIMARY KEY (clicensenumber))",
    ),
    (
        "Teams",
        "CREATE TABLE Teams (\
            tname VARCHAR(40), \
            city VARCHAR(40), \
            winpercent INTEGER, \
            PRIMARY KEY (tname, city), \
            FOREIGN KEY (city) REFERENCES Cities (city))",
    ),
    (
        "Players",
        "CREATE TABLE Players (\
            jerseynumber INTEGER, \
            tname VARCHAR(40), \
            city VARCHAR(40), \
            pname VARCHAR(40) NOT NULL, \
            height INTEGER, \
            weight INTEGER, \
            age INTEGER, \
            clicensenumber INTEGER NOT NULL, \
            PRIMARY KEY (tname, city, jerseynumber), \
            FOREIGN KEY (tname, city) REFERENCES Teams (tname, city) ON DELETE CASCADE, \
            FOREIGN KEY (clicensenumber) REFERENCES Coaches (clicensenumber))",
    ),
    (
        "Matches",
        "CREATE TABLE Matches (\
            mid VARCHAR(10), \
            oname VARCHAR(40) NOT NULL, \
            stname VARCHAR(40) NOT NULL, \
            rentalfee INTEGER NOT NULL, \
            team_a VARCHAR(40) NOT NULL, \
            city_a VARCHAR(40) NOT NULL, \
            team_b VARCHAR(40) NOT NULL, \
            city_b VARCHAR(40) NOT NULL, \
            match_date DATE, \
            result VARCHAR(10), \
            PRIMARY KEY (mid), \
            FOREIGN KEY (team_a, city_a) REFERENCES Teams (tname, city), \
            FOREIGN KEY (team_b, city_b) REFERENCES Teams (tname, city))",
    ),
    (
        "Livestreams",
        "CREATE TABLE Livestreams (\
            bname VARCHAR(40), \
            country VARCHAR(40), \
            mid VARCHAR(10), \
            PRIMARY KEY (bname, country, mid), \
            FOREIGN KEY (bname, country) REFERENCES TV (bname, country) ON DELETE CASCADE, \
            FOREIGN KEY (mid) REFERENCES Matches (mid) ON DELETE CASCADE)",
    ),
];

/// A table that could not be created during bootstrap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupWarning {
    pub table: String,
    pub message: String,
}

/// Outcome of a bootstrap run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapReport {
    pub tables_created: Vec<String>,
    pub warnings: Vec<SetupWarning>,
    pub seeds_inserted: usize,
    pub seeds_failed: usize,
}

impl BootstrapReport {
    pub(crate) fn warn(&mut self, table: &str, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(table, %message, "table setup failed; continuing");
        self.warnings.push(SetupWarning {
            table: table.to_string(),
            message,
        });
    }

    pub(crate) fn seeded(&mut self, ok: bool) {
        if ok {
            self.seeds_inserted += 1;
        } else {
            self.seeds_failed += 1;
        }
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.seeds_failed == 0
    }
}

/// Fixed seed rows, grouped per table in insertion order
#[derive(Debug, Clone)]
pub struct SeedData {
    pub branches: Vec<Branch>,
    pub cities: Vec<City>,
    pub coaches: Vec<Coach>,
    pub teams: Vec<Team>,
    pub players: Vec<Player>,
    pub matches: Vec<Match>,
    pub broadcasters: Vec<TvBroadcaster>,
    pub livestreams: Vec<Livestream>,
}

impl SeedData {
    pub fn total(&self) -> usize {
        self.branches.len()
            + self.cities.len()
            + self.coaches.len()
            + self.teams.len()
            + self.players.len()
            + self.matches.len()
            + self.broadcasters.len()
            + self.livestreams.len()
    }
}

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

pub fn seed_data() -> SeedData {
    const LIVERPOOL: (&str, &str) = ("Liverpool", "Liverpool");
    const MANCHESTER: (&str, &str) = ("Manchester United", "Manchester");
    const MADRID: (&str, &str) = ("Real Madrid", "Madrid");
    const BARCELONA: (&str, &str) = ("FC Barcelona", "Barcelona");
    const CHELSEA: (&str, &str) = ("Chelsea", "Chelsea");

    let livestreams = [
        ("ABC", "USA", &["ASD432", "QWE765", "ZXC098", "FGH135"][..]),
        ("CNN", "USA", &["QWE765", "ZXC098", "FGH135"][..]),
        ("Sportsnet", "Canada", &["ZXC098", "FGH135"][..]),
    ]
    .into_iter()
    .flat_map(|(name, country, mids)| {
        mids.iter()
            .map(move |mid| Livestream::new(name, country, mid))
    })
    .collect();

    SeedData {
        branches: vec![
            Branch::new(1, "First Branch", "123 Charming Ave", "Vancouver", 1234567),
            Branch::new(2, "Second Branch", "123 Coco Ave", "Vancouver", 1234568),
        ],
        cities: vec![
            City::new("Liverpool", "England"),
            City::new("Manchester", "England"),
            City::new("Madrid", "Spain"),
            City::new("Barcelona", "Spain"),
            City::new("Chelsea", "England"),
        ],
        coaches: vec![
            Coach::new(12345, "Jim Slim", "Male", 55),
            Coach::new(67890, "Ben Ten", "Male", 44),
        ],
        teams: vec![
            Team::new(Some(LIVERPOOL.0), Some(LIVERPOOL.1), 77),
            Team::new(Some(MANCHESTER.0), Some(MANCHESTER.1), 66),
            Team::new(Some(MADRID.0), Some(MADRID.1), 71),
            Team::new(Some(BARCELONA.0), Some(BARCELONA.1), 69),
            Team::new(Some(CHELSEA.0), Some(CHELSEA.1), -1),
        ],
        players: vec![
            Player::new(1, LIVERPOOL.0, LIVERPOOL.1, "John Blonde", 175, 75, 33, 12345),
            Player::new(2, LIVERPOOL.0, LIVERPOOL.1, "Jack Black", 185, 85, 34, 12345),
            Player::new(3, LIVERPOOL.0, LIVERPOOL.1, "Jay Gray", 165, 65, 35, 12345),
            Player::new(11, MANCHESTER.0, MANCHESTER.1, "Billy Klub", 167, 67, 36, 67890),
            Player::new(22, MANCHESTER.0, MANCHESTER.1, "Bobby Pynn", 177, 77, 37, 67890),
            Player::new(33, MANCHESTER.0, MANCHESTER.1, "Barry Caid", 187, 87, 38, 67890),
        ],
        matches: vec![
            Match::new(
                "ASD432",
                "FIFA",
                "Thunderbird Stadium",
                10000,
                MANCHESTER,
                LIVERPOOL,
                date(2017, 1, 1),
                Some("5-6"),
            ),
            Match::new(
                "QWE765",
                "Junior Football League",
                "Tokyo Dome",
                25000,
                MADRID,
                BARCELONA,
                date(1997, 12, 5),
                Some("6-7"),
            ),
            Match::new(
                "ZXC098",
                "Senior Football League",
                "BC Place",
                5000,
                CHELSEA,
                LIVERPOOL,
                date(2007, 3, 25),
                Some("2-3"),
            ),
            Match::new(
                "FGH135",
                "FIFA",
                "Tokyo Dome",
                15000,
                BARCELONA,
                MANCHESTER,
                date(2027, 9, 15),
                None,
            ),
        ],
        broadcasters: vec![
            TvBroadcaster::new("ABC", "USA", 93461996, 101),
            TvBroadcaster::new("CNN", "USA", 94866588, 202),
            TvBroadcaster::new("Sportsnet", "Canada", 75054932, 303),
        ],
        livestreams,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_fixed_tables_respect_dependency_order() {
        let order: Vec<&str> = FIXED_TABLES.iter().map(|(name, _)| *name).collect();
        let pos = |t: &str| order.iter().position(|n| *n == t).unwrap();

        assert!(pos("Cities") < pos("Teams"));
        assert!(pos("Teams") < pos("Players"));
        assert!(pos("Coaches") < pos("Players"));
        assert!(pos("Teams") < pos("Matches"));
        assert!(pos("TV") < pos("Livestreams"));
        assert!(pos("Matches") < pos("Livestreams"));
        assert!(!order.contains(&RECREATED_TABLE));
    }

    #[test]
    fn test_seed_data_is_referentially_consistent() {
        let seeds = seed_data();
        let cities: HashSet<_> = seeds.cities.iter().map(|c| c.city.as_str()).collect();
        let teams: HashSet<_> = seeds
            .teams
            .iter()
            .map(|t| (t.name.as_deref().unwrap(), t.city.as_deref().unwrap()))
            .collect();
        let coaches: HashSet<_> = seeds.coaches.iter().map(|c| c.license_number).collect();
        let matches: HashSet<_> = seeds.matches.iter().map(|m| m.match_id.as_str()).collect();
        let broadcasters: HashSet<_> = seeds
            .broadcasters
            .iter()
            .map(|b| (b.name.as_str(), b.country.as_str()))
            .collect();

        assert!(teams.iter().all(|(_, city)| cities.contains(city)));
        for p in &seeds.players {
            assert!(teams.contains(&(p.team.as_str(), p.city.as_str())));
            assert!(coaches.contains(&p.coach_license));
        }
        for m in &seeds.matches {
            assert!(teams.contains(&(m.team_a.as_str(), m.city_a.as_str())));
            assert!(teams.contains(&(m.team_b.as_str(), m.city_b.as_str())));
        }
        for l in &seeds.livestreams {
            assert!(matches.contains(l.match_id.as_str()));
            assert!(broadcasters.contains(&(l.broadcaster.as_str(), l.country.as_str())));
        }
    }

    #[test]
    fn test_seed_counts() {
        let seeds = seed_data();
        assert_eq!(seeds.branches.len(), 2);
        assert_eq!(seeds.livestreams.len(), 9);
        assert_eq!(seeds.total(), 2 + 5 + 2 + 5 + 6 + 4 + 3 + 9);
        assert_eq!(seeds.teams[4].win_percent, None);
    }

    #[test]
    fn test_report_accounting() {
        let mut report = BootstrapReport::default();
        assert!(report.is_clean());

        report.seeded(true);
        report.seeded(false);
        report.warn("Teams", "table already exists");

        assert_eq!((report.seeds_inserted, report.seeds_failed), (1, 1));
        assert_eq!(report.warnings[0].table, "Teams");
        assert!(!report.is_clean());
    }
}
