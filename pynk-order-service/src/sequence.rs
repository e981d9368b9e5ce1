//! Daily order ordinals and the public order codes built from them.

use chrono::NaiveDate;
use diesel::{insert_into, prelude::*};

use crate::schema::daily_sequences::dsl::*;

/// Atomically claims the next ordinal for `date`.
///
/// A single `INSERT .. ON CONFLICT DO UPDATE .. RETURNING` statement, so
/// concurrent callers on the same day always get distinct values. Call it
/// inside the transaction that inserts the order so a rolled-back order
/// also rolls back the ordinal.
pub fn next_ordinal(conn: &mut PgConnection, date: NaiveDate) -> QueryResult<i32> {
    insert_into(daily_sequences)
        .values((seq_date.eq(date), next_seq.eq(1)))
        .on_conflict(seq_date)
        .do_update()
        .set(next_seq.eq(next_seq + 1))
        .returning(next_seq)
        .get_result(conn)
}

/// `DDMM` followed by the ordinal, zero padded to at least two digits.
/// Ordinals past 99 widen the code (`DDMM100`) rather than wrap.
pub fn format_code(date: NaiveDate, ordinal: i32) -> String {
    format!("{}{:02}", date.format("%d%m"), ordinal)
}

pub fn next_code(conn: &mut PgConnection, date: NaiveDate) -> QueryResult<String> {
    next_ordinal(conn, date).map(|ordinal| format_code(date, ordinal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_format_code_pads_to_two_digits() {
        assert_eq!(format_code(date(2025, 3, 7), 1), "070301");
        assert_eq!(format_code(date(2025, 12, 31), 42), "311242");
    }

    #[test]
    fn test_format_code_widens_past_99() {
        assert_eq!(format_code(date(2025, 3, 7), 99), "070399");
        assert_eq!(format_code(date(2025, 3, 7), 100), "0703100");
        assert_ne!(format_code(date(2025, 3, 7), 100), format_code(date(2025, 3, 7), 1));
    }
}
