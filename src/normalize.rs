use tracing::debug;

use crate::types::{NormalizedOrder, Order, Origin};

/// A validated input row, with dimensions known to be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidOrder {
    pub length: u32,
    pub width: u32,
    pub count: u32,
}

/// Drops rows with a non-positive (or unrepresentable) length, width or
/// count. Returns the kept rows and the number dropped.
pub fn validate(orders: &[Order]) -> (Vec<ValidOrder>, u32) {
    let mut kept = Vec::with_capacity(orders.len());
    let mut dropped = 0;
    for o in orders {
        let row = (
            u32::try_from(o.length),
            u32::try_from(o.width),
            u32::try_from(o.count),
        );
        match row {
            (Ok(length), Ok(width), Ok(count)) if length > 0 && width > 0 && count > 0 => {
                kept.push(ValidOrder {
                    length,
                    width,
                    count,
                });
            }
            _ => {
                debug!(order = %o, "dropping invalid order row");
                dropped += 1;
            }
        }
    }
    (kept, dropped)
}

/// Splits every row wider than the sheet into full-width strips plus one
/// remainder row, so no emitted row is wider than `sheet_width`.
///
/// A row whose strip count does not fit a `u32` is dropped whole. Returns the
/// emitted rows and the number of orders dropped.
///
/// `sheet_width` must be non-zero.
pub fn normalize(orders: &[ValidOrder], sheet_width: u32) -> (Vec<NormalizedOrder>, u32) {
    let mut out = Vec::with_capacity(orders.len());
    let mut dropped = 0;
    for o in orders {
        if o.width <= sheet_width {
            out.push(NormalizedOrder::native(o.length, o.width, o.count));
            continue;
        }
        let strips = o.width / sheet_width;
        let rest = o.width % sheet_width;
        let Some(full_count) = o.count.checked_mul(strips) else {
            debug!(
                length = o.length,
                width = o.width,
                count = o.count,
                "dropping order: strip count overflows"
            );
            dropped += 1;
            continue;
        };
        if strips > 0 {
            out.push(NormalizedOrder {
                length: o.length,
                width: sheet_width,
                count: full_count,
                origin: Origin::SplitFull,
                strips,
            });
        }
        if rest > 0 {
            out.push(NormalizedOrder {
                length: o.length,
                width: rest,
                count: o.count,
                origin: Origin::SplitRest,
                strips,
            });
        }
    }
    (out, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid(length: u32, width: u32, count: u32) -> ValidOrder {
        ValidOrder {
            length,
            width,
            count,
        }
    }

    #[test]
    fn test_native_rows_pass_through() {
        let (rows, _) = normalize(&[valid(3000, 300, 5), valid(2000, 1000, 1)], 1000);
        assert_eq!(
            rows,
            vec![
                NormalizedOrder::native(3000, 300, 5),
                NormalizedOrder::native(2000, 1000, 1)
            ]
        );
    }

    #[test]
    fn test_oversize_split_into_full_and_rest() {
        let (rows, _) = normalize(&[valid(2500, 1200, 1)], 1000);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].origin, Origin::SplitFull);
        assert_eq!((rows[0].width, rows[0].count, rows[0].strips), (1000, 1, 1));
        assert_eq!(rows[1].origin, Origin::SplitRest);
        assert_eq!((rows[1].width, rows[1].count, rows[1].strips), (200, 1, 1));
    }

    #[test]
    fn test_full_strips_multiply_count() {
        let (rows, _) = normalize(&[valid(2500, 3000, 2)], 1000);
        assert_eq!(rows.len(), 1, "exact multiple leaves no remainder row");
        assert_eq!(rows[0].origin, Origin::SplitFull);
        assert_eq!(rows[0].count, 6);
        assert_eq!(rows[0].strips, 3);
    }

    #[test]
    fn test_overflowing_strip_count_drops_order() {
        let (rows, dropped) = normalize(
            &[valid(1000, 2500, u32::MAX), valid(2000, 2500, 3_000_000_000), valid(2500, 1200, 2)],
            1000,
        );
        assert_eq!(dropped, 2);
        assert_eq!(rows.len(), 2, "only the representable order is split");
        assert!(rows.iter().all(|r| r.length == 2500));

        // One strip per piece never overflows.
        let (rows, dropped) = normalize(&[valid(1000, 1500, u32::MAX)], 1000);
        assert_eq!(dropped, 0);
        assert_eq!(rows[0].count, u32::MAX);
    }

    #[test]
    fn test_no_row_wider_than_sheet() {
        let input: Vec<ValidOrder> = (1..40).map(|i| valid(1000, i * 137, 2)).collect();
        for row in normalize(&input, 1000).0 {
            assert!(row.width <= 1000, "row {:?} wider than sheet", row);
        }
    }

    #[test]
    fn test_renormalizing_is_noop() {
        let input = vec![valid(2500, 1200, 1), valid(3000, 300, 5), valid(900, 2750, 3)];
        let (once, _) = normalize(&input, 1000);
        let again: Vec<ValidOrder> = once
            .iter()
            .map(|r| valid(r.length, r.width, r.count))
            .collect();
        let (twice, _) = normalize(&again, 1000);
        let widths = |rows: &[NormalizedOrder]| {
            rows.iter()
                .map(|r| (r.length, r.width, r.count))
                .collect::<Vec<_>>()
        };
        assert_eq!(widths(&once), widths(&twice));
        assert!(twice.iter().all(|r| r.origin == Origin::Native));
    }

    #[test]
    fn test_validate_drops_bad_rows() {
        let (kept, dropped) = validate(&[
            Order::new(3000, 300, 5),
            Order::new(0, 300, 1),
            Order::new(3000, -1, 1),
            Order::new(3000, 300, 0),
        ]);
        assert_eq!(kept, vec![valid(3000, 300, 5)]);
        assert_eq!(dropped, 3);
    }
}
