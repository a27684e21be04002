//! Read-only aggregate queries over the league tables
//!
//! Reports run without a transaction. An empty result is an empty `Vec` (or
//! `None`), never an error.

use super::handler::ConnectionHandler;
use crate::core::{Database, DatabaseError, DatabaseValue, Result, RowExt};
use serde::{Deserialize, Serialize};

/// Number of matches a team took part in, on either side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMatchCount {
    pub team: String,
    pub city: String,
    pub matches: i32,
}

/// The Coaches columns that can be projected by [`ConnectionHandler::coach_attribute`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoachAttribute {
    LicenseNumber,
    Name,
    Gender,
    Age,
}

impl CoachAttribute {
    pub fn column(&self) -> &'static str {
        match self {
            CoachAttribute::LicenseNumber => "clicensenumber",
            CoachAttribute::Name => "cname",
            CoachAttribute::Gender => "gender",
            CoachAttribute::Age => "age",
        }
    }
}

impl std::str::FromStr for CoachAttribute {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "clicensenumber" | "license" | "license_number" => Ok(CoachAttribute::LicenseNumber),
            "cname" | "name" => Ok(CoachAttribute::Name),
            "gender" => Ok(CoachAttribute::Gender),
            "age" => Ok(CoachAttribute::Age),
            _ => Err(DatabaseError::ColumnNotFound(s.to_string())),
        }
    }
}

const COACH_OF_PLAYER: &str = "SELECT c.cname AS cname \
    FROM Players p JOIN Coaches c ON p.clicensenumber = c.clicensenumber \
    WHERE p.jerseynumber = ? AND p.tname = ? AND p.city = ?";

const PLAYERS_TALLER_THAN: &str =
    "SELECT pname FROM Players WHERE height > ? ORDER BY pname";

const CITIES_ABOVE_AVERAGE_HEIGHT: &str = "SELECT city FROM Players \
    GROUP BY city \
    HAVING AVG(height) > (\
        SELECT AVG(avg_height) FROM (\
            SELECT AVG(height) AS avg_height FROM Players GROUP BY city\
        ) per_city\
    ) \
    ORDER BY city";

const AVERAGE_WIN_PERCENT: &str =
    "SELECT CAST(AVG(winpercent) AS DOUBLE PRECISION) AS avg_win FROM Teams";

const MATCHES_PER_TEAM: &str = "SELECT tname, city, COUNT(*) AS played FROM (\
        SELECT team_a AS tname, city_a AS city FROM Matches \
        UNION ALL \
        SELECT team_b AS tname, city_b AS city FROM Matches\
    ) sides \
    GROUP BY tname, city \
    ORDER BY tname, city";

const BROADCASTERS_COVERING_ALL: &str = "SELECT t.bname AS bname, t.country AS country FROM TV t \
    WHERE NOT EXISTS (\
        SELECT m.mid FROM Matches m WHERE NOT EXISTS (\
            SELECT 1 FROM Livestreams l \
            WHERE l.bname = t.bname AND l.country = t.country AND l.mid = m.mid\
        )\
    ) \
    ORDER BY t.bname, t.country";

impl<D: Database + Default + 'static> ConnectionHandler<D> {
    /// Name of the coach assigned to a player, if the player exists
    pub async fn coach_name_for_player(
        &self,
        jersey_number: i32,
        team: &str,
        city: &str,
    ) -> Result<Option<String>> {
        let statement = self.prepare(COACH_OF_PLAYER, |s| {
            s.push(jersey_number)?.push(team)?.push(city).map(|_| ())
        })?;
        let rows = self.read("coach of player", &statement).await?;
        rows.first().map(|row| row.text("cname")).transpose()
    }

    pub async fn players_taller_than(&self, height: i32) -> Result<Vec<String>> {
        let statement = self.prepare(PLAYERS_TALLER_THAN, |s| s.push(height).map(|_| ()))?;
        let rows = self.read("players taller than", &statement).await?;
        rows.iter().map(|row| row.text("pname")).collect()
    }

    /// Cities whose average player height exceeds the mean of all per-city averages
    pub async fn cities_above_average_height(&self) -> Result<Vec<String>> {
        let rows = self
            .read(
                "cities above average height",
                &self.statement(CITIES_ABOVE_AVERAGE_HEIGHT),
            )
            .await?;
        rows.iter().map(|row| row.text("city")).collect()
    }

    /// One column of every coach, ordered by license number
    pub async fn coach_attribute(&self, attribute: CoachAttribute) -> Result<Vec<DatabaseValue>> {
        let column = attribute.column();
        let sql = format!(
            "SELECT {} FROM Coaches ORDER BY clicensenumber",
            column
        );
        let rows = self.read("coach attribute", &self.statement(sql)).await?;
        rows.into_iter()
            .map(|mut row| {
                row.remove(column)
                    .ok_or_else(|| DatabaseError::ColumnNotFound(column.to_string()))
            })
            .collect()
    }

    /// Mean win percentage over teams with a known percentage
    pub async fn average_win_percent(&self) -> Result<Option<f64>> {
        let rows = self
            .read("average win percent", &self.statement(AVERAGE_WIN_PERCENT))
            .await?;
        rows.first()
            .ok_or_else(|| DatabaseError::query("aggregate returned no row"))?
            .opt_double("avg_win")
    }

    pub async fn matches_played_per_team(&self) -> Result<Vec<TeamMatchCount>> {
        let rows = self
            .read("matches per team", &self.statement(MATCHES_PER_TEAM))
            .await?;
        rows.iter()
            .map(|row| {
                Ok(TeamMatchCount {
                    team: row.text("tname")?,
                    city: row.text("city")?,
                    matches: row.int("played")?,
                })
            })
            .collect()
    }

    /// Broadcasters that livestream every match, as `(name, country)`
    pub async fn broadcasters_covering_all_matches(&self) -> Result<Vec<(String, String)>> {
        let rows = self
            .read(
                "broadcasters covering all matches",
                &self.statement(BROADCASTERS_COVERING_ALL),
            )
            .await?;
        rows.iter()
            .map(|row| Ok((row.text("bname")?, row.text("country")?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coach_attribute_whitelist() {
        assert_eq!("AGE".parse::<CoachAttribute>().unwrap(), CoachAttribute::Age);
        assert_eq!("cname".parse::<CoachAttribute>().unwrap().column(), "cname");
        assert!(matches!(
            "age; DROP TABLE Coaches".parse::<CoachAttribute>(),
            Err(DatabaseError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_report_statements_have_expected_parameters() {
        use crate::core::Statement;

        assert_eq!(Statement::new(COACH_OF_PLAYER).parameter_count(), 3);
        assert_eq!(Statement::new(PLAYERS_TALLER_THAN).parameter_count(), 1);
        assert_eq!(Statement::new(MATCHES_PER_TEAM).parameter_count(), 0);
        assert_eq!(Statement::new(BROADCASTERS_COVERING_ALL).parameter_count(), 0);
    }
}
