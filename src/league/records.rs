//! Record types for the league schema
//!
//! Records are flat data carriers. Optional numeric fields are `Option`s; the
//! `new` constructors take the caller's raw numbers and translate each field's
//! sentinel into `None`, which is stored as NULL.

use crate::core::{DatabaseRow, Result, RowExt, Statement};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Caller-visible "no value" markers, per field
pub mod sentinel {
    pub const BRANCH_PHONE: i32 = 0;
    pub const PLAYER_HEIGHT: i32 = 0;
    pub const PLAYER_WEIGHT: i32 = 0;
    pub const PLAYER_AGE: i32 = -1;
    pub const COACH_AGE: i32 = 0;
    pub const TEAM_WIN_PERCENT: i32 = -1;
}

/// `None` when `value` is the field's sentinel, the value otherwise
pub fn nullable(value: i32, sentinel: i32) -> Option<i32> {
    (value != sentinel).then_some(value)
}

/// A table-backed record
///
/// `COLUMNS` is the declared column order; `bind` pushes exactly one
/// parameter per column in that order.
pub trait Record: Sized {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];
    const ORDER_BY: &'static str;

    fn bind(&self, statement: &mut Statement) -> Result<()>;

    fn from_row(row: &DatabaseRow) -> Result<Self>;

    /// Short human-readable key, for log lines
    fn key(&self) -> String;

    fn insert_sql() -> String {
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            Self::TABLE,
            Self::COLUMNS.join(", "),
            vec!["?"; Self::COLUMNS.len()].join(", ")
        )
    }

    fn select_sql() -> String {
        format!(
            "SELECT {} FROM {} ORDER BY {}",
            Self::COLUMNS.join(", "),
            Self::TABLE,
            Self::ORDER_BY
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub branch_id: i32,
    pub name: String,
    pub address: String,
    pub city: String,
    pub phone: Option<i32>,
}

impl Branch {
    /// `phone` of 0 means no phone number
    pub fn new(branch_id: i32, name: &str, address: &str, city: &str, phone: i32) -> Self {
        Self {
            branch_id,
            name: name.to_string(),
            address: address.to_string(),
            city: city.to_string(),
            phone: nullable(phone, sentinel::BRANCH_PHONE),
        }
    }
}

impl Record for Branch {
    const TABLE: &'static str = "branch";
    const COLUMNS: &'static [&'static str] = &[
        "branch_id",
        "branch_name",
        "branch_addr",
        "branch_city",
        "branch_phone",
    ];
    const ORDER_BY: &'static str = "branch_id";

    fn bind(&self, statement: &mut Statement) -> Result<()> {
        statement
            .push(self.branch_id)?
            .push(self.name.as_str())?
            .push(self.address.as_str())?
            .push(self.city.as_str())?
            .push_opt_int(self.phone)?;
        Ok(())
    }

    fn from_row(row: &DatabaseRow) -> Result<Self> {
        Ok(Self {
            branch_id: row.int("branch_id")?,
            name: row.text("branch_name")?,
            address: row.text("branch_addr")?,
            city: row.text("branch_city")?,
            phone: row.opt_int("branch_phone")?,
        })
    }

    fn key(&self) -> String {
        format!("Branch {}", self.branch_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub city: String,
    pub country: String,
}

impl City {
    pub fn new(city: &str, country: &str) -> Self {
        Self {
            city: city.to_string(),
            country: country.to_string(),
        }
    }
}

impl Record for City {
    const TABLE: &'static str = "Cities";
    const COLUMNS: &'static [&'static str] = &["city", "country"];
    const ORDER_BY: &'static str = "city";

    fn bind(&self, statement: &mut Statement) -> Result<()> {
        statement
            .push(self.city.as_str())?
            .push(self.country.as_str())?;
        Ok(())
    }

    fn from_row(row: &DatabaseRow) -> Result<Self> {
        Ok(Self {
            city: row.text("city")?,
            country: row.text("country")?,
        })
    }

    fn key(&self) -> String {
        format!("City {}", self.city)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coach {
    pub license_number: i32,
    pub name: String,
    pub gender: String,
    pub age: Option<i32>,
}

impl Coach {
    /// `age` of 0 means unknown
    pub fn new(license_number: i32, name: &str, gender: &str, age: i32) -> Self {
        Self {
            license_number,
            name: name.to_string(),
            gender: gender.to_string(),
            age: nullable(age, sentinel::COACH_AGE),
        }
    }
}

impl Record for Coach {
    const TABLE: &'static str = "Coaches";
    const COLUMNS: &'static [&'static str] = &["clicensenumber", "cname", "gender", "age"];
    const ORDER_BY: &'static str = "clicensenumber";

    fn bind(&self, statement: &mut Statement) -> Result<()> {
        statement
            .push(self.license_number)?
            .push(self.name.as_str())?
            .push(self.gender.as_str())?
            .push_opt_int(self.age)?;
        Ok(())
    }

    fn from_row(row: &DatabaseRow) -> Result<Self> {
        Ok(Self {
            license_number: row.int("clicensenumber")?,
            name: row.text("cname")?,
            gender: row.text("gender")?,
            age: row.opt_int("age")?,
        })
    }

    fn key(&self) -> String {
        format!("Coach {}", self.license_number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub name: Option<String>,
    pub city: Option<String>,
    pub win_percent: Option<i32>,
}

impl Team {
    /// `win_percent` of -1 means unknown
    pub fn new(name: Option<&str>, city: Option<&str>, win_percent: i32) -> Self {
        Self {
            name: name.map(str::to_string),
            city: city.map(str::to_string),
            win_percent: nullable(win_percent, sentinel::TEAM_WIN_PERCENT),
        }
    }
}

impl Record for Team {
    const TABLE: &'static str = "Teams";
    const COLUMNS: &'static [&'static str] = &["tname", "city", "winpercent"];
    const ORDER_BY: &'static str = "tname, city";

    fn bind(&self, statement: &mut Statement) -> Result<()> {
        statement
            .push_opt_text(self.name.as_deref())?
            .push_opt_text(self.city.as_deref())?
            .push_opt_int(self.win_percent)?;
        Ok(())
    }

    fn from_row(row: &DatabaseRow) -> Result<Self> {
        Ok(Self {
            name: row.opt_text("tname")?,
            city: row.opt_text("city")?,
            win_percent: row.opt_int("winpercent")?,
        })
    }

    fn key(&self) -> String {
        format!(
            "Team {} in {}",
            self.name.as_deref().unwrap_or("<none>"),
            self.city.as_deref().unwrap_or("<none>")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub jersey_number: i32,
    pub team: String,
    pub city: String,
    pub name: String,
    pub height: Option<i32>,
    pub weight: Option<i32>,
    pub age: Option<i32>,
    pub coach_license: i32,
}

impl Player {
    /// `height` and `weight` of 0 and `age` of -1 mean unknown
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        jersey_number: i32,
        team: &str,
        city: &str,
        name: &str,
        height: i32,
        weight: i32,
        age: i32,
        coach_license: i32,
    ) -> Self {
        Self {
            jersey_number,
            team: team.to_string(),
            city: city.to_string(),
            name: name.to_string(),
            height: nullable(height, sentinel::PLAYER_HEIGHT),
            weight: nullable(weight, sentinel::PLAYER_WEIGHT),
            age: nullable(age, sentinel::PLAYER_AGE),
            coach_license,
        }
    }
}

impl Record for Player {
    const TABLE: &'static str = "Players";
    const COLUMNS: &'static [&'static str] = &[
        "jerseynumber",
        "tname",
        "city",
        "pname",
        "height",
        "weight",
        "age",
        "clicensenumber",
    ];
    const ORDER_BY: &'static str = "tname, city, jerseynumber";

    fn bind(&self, statement: &mut Statement) -> Result<()> {
        statement
            .push(self.jersey_number)?
            .push(self.team.as_str())?
            .push(self.city.as_str())?
            .push(self.name.as_str())?
            .push_opt_int(self.height)?
            .push_opt_int(self.weight)?
            .push_opt_int(self.age)?
            .push(self.coach_license)?;
        Ok(())
    }

    fn from_row(row: &DatabaseRow) -> Result<Self> {
        Ok(Self {
            jersey_number: row.int("jerseynumber")?,
            team: row.text("tname")?,
            city: row.text("city")?,
            name: row.text("pname")?,
            height: row.opt_int("height")?,
            weight: row.opt_int("weight")?,
            age: row.opt_int("age")?,
            coach_license: row.int("clicensenumber")?,
        })
    }

    fn key(&self) -> String {
        format!(
            "Player {} in team {} in {}",
            self.jersey_number, self.team, self.city
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub match_id: String,
    pub organizer: String,
    pub stadium: String,
    pub rental_fee: i32,
    pub team_a: String,
    pub city_a: String,
    pub team_b: String,
    pub city_b: String,
    pub date: Option<NaiveDate>,
    pub result: Option<String>,
}

impl Match {
    /// Teams are `(name, city)` pairs
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        match_id: &str,
        organizer: &str,
        stadium: &str,
        rental_fee: i32,
        team_a: (&str, &str),
        team_b: (&str, &str),
        date: Option<NaiveDate>,
        result: Option<&str>,
    ) -> Self {
        Self {
            match_id: match_id.to_string(),
            organizer: organizer.to_string(),
            stadium: stadium.to_string(),
            rental_fee,
            team_a: team_a.0.to_string(),
            city_a: team_a.1.to_string(),
            team_b: team_b.0.to_string(),
            city_b: team_b.1.to_string(),
            date,
            result: result.map(str::to_string),
        }
    }
}

impl Record for Match {
    const TABLE: &'static str = "Matches";
    const COLUMNS: &'static [&'static str] = &[
        "mid",
        "oname",
        "stname",
        "rentalfee",
        "team_a",
        "city_a",
        "team_b",
        "city_b",
        "match_date",
        "result",
    ];
    const ORDER_BY: &'static str = "mid";

    fn bind(&self, statement: &mut Statement) -> Result<()> {
        statement
            .push(self.match_id.as_str())?
            .push(self.organizer.as_str())?
            .push(self.stadium.as_str())?
            .push(self.rental_fee)?
            .push(self.team_a.as_str())?
            .push(self.city_a.as_str())?
            .push(self.team_b.as_str())?
            .push(self.city_b.as_str())?
            .push_opt_date(self.date)?
            .push_opt_text(self.result.as_deref())?;
        Ok(())
    }

    fn from_row(row: &DatabaseRow) -> Result<Self> {
        Ok(Self {
            match_id: row.text("mid")?,
            organizer: row.text("oname")?,
            stadium: row.text("stname")?,
            rental_fee: row.int("rentalfee")?,
            team_a: row.text("team_a")?,
            city_a: row.text("city_a")?,
            team_b: row.text("team_b")?,
            city_b: row.text("city_b")?,
            date: row.opt_date("match_date")?,
            result: row.opt_text("result")?,
        })
    }

    fn key(&self) -> String {
        format!("Match {}", self.match_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TvBroadcaster {
    pub name: String,
    pub country: String,
    pub contact: i32,
    pub channel_number: i32,
}

impl TvBroadcaster {
    pub fn new(name: &str, country: &str, contact: i32, channel_number: i32) -> Self {
        Self {
            name: name.to_string(),
            country: country.to_string(),
            contact,
            channel_number,
        }
    }
}

impl Record for TvBroadcaster {
    const TABLE: &'static str = "TV";
    const COLUMNS: &'static [&'static str] = &["bname", "country", "contact", "channelnumber"];
    const ORDER_BY: &'static str = "bname, country";

    fn bind(&self, statement: &mut Statement) -> Result<()> {
        statement
            .push(self.name.as_str())?
            .push(self.country.as_str())?
            .push(self.contact)?
            .push(self.channel_number)?;
        Ok(())
    }

    fn from_row(row: &DatabaseRow) -> Result<Self> {
        Ok(Self {
            name: row.text("bname")?,
            country: row.text("country")?,
            contact: row.int("contact")?,
            channel_number: row.int("channelnumber")?,
        })
    }

    fn key(&self) -> String {
        format!("Broadcaster {} ({})", self.name, self.country)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Livestream {
    pub broadcaster: String,
    pub country: String,
    pub match_id: String,
}

impl Livestream {
    pub fn new(broadcaster: &str, country: &str, match_id: &str) -> Self {
        Self {
            broadcaster: broadcaster.to_string(),
            country: country.to_string(),
            match_id: match_id.to_string(),
        }
    }
}

impl Record for Livestream {
    const TABLE: &'static str = "Livestreams";
    const COLUMNS: &'static [&'static str] = &["bname", "country", "mid"];
    const ORDER_BY: &'static str = "bname, country, mid";

    fn bind(&self, statement: &mut Statement) -> Result<()> {
        statement
            .push(self.broadcaster.as_str())?
            .push(self.country.as_str())?
            .push(self.match_id.as_str())?;
        Ok(())
    }

    fn from_row(row: &DatabaseRow) -> Result<Self> {
        Ok(Self {
            broadcaster: row.text("bname")?,
            country: row.text("country")?,
            match_id: row.text("mid")?,
        })
    }

    fn key(&self) -> String {
        format!(
            "Livestream of {} by {} ({})",
            self.match_id, self.broadcaster, self.country
        )
    }
}
