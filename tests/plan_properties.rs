use strip_planner::normalize::{ValidOrder, normalize};
use strip_planner::types::{CutPlan, OffcutFate, Origin, ScrapNeed};
use strip_planner::{AntiWaste, CutOptions, Order, calculate_cuts};

/// Small deterministic generator so failures are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn pick<T: Copy>(&mut self, items: &[T]) -> T {
        items[(self.next() % items.len() as u64) as usize]
    }
}

fn random_orders(rng: &mut Lcg, n: usize) -> Vec<Order> {
    let lengths = [900, 1000, 1001, 1500, 2000, 2002, 2500, 3000];
    (0..n)
        .map(|_| {
            let width = 50 + (rng.next() % 1450) as i64;
            let count = 1 + (rng.next() % 6) as i64;
            Order::new(rng.pick(&lengths), width, count)
        })
        .collect()
}

fn option_grid() -> Vec<CutOptions> {
    let mut grid = Vec::new();
    for min_leftover in [0, 60] {
        for allow_fallback in [false, true] {
            for tail_wanted_b in [0, 150] {
                for anti in [
                    AntiWaste::default(),
                    AntiWaste {
                        enabled: true,
                        min_l_no_cut: Some(950),
                        limit_merge_b: Some(300),
                        max_merge_k: None,
                        last_no_cut_b: Some(40),
                    },
                    AntiWaste {
                        enabled: true,
                        min_l_no_cut: None,
                        limit_merge_b: Some(200),
                        max_merge_k: Some(1),
                        last_no_cut_b: None,
                    },
                ] {
                    grid.push(CutOptions {
                        sheet_width: 1000,
                        tolerance_l: 2,
                        allow_fallback,
                        min_leftover,
                        tail_wanted_b,
                        order_by_remainder: min_leftover == 60,
                        use_patterns: allow_fallback && tail_wanted_b == 0,
                        anti,
                    });
                }
            }
        }
    }
    grid
}

fn assert_plan_invariants(plan: &CutPlan, opts: &CutOptions) {
    for cut in &plan.cut_log {
        assert_eq!(
            cut.used_width() + cut.offcut_width,
            opts.sheet_width,
            "sheet not conserved: {:?}",
            cut
        );
        match cut.offcut {
            OffcutFate::Remnant => assert!(cut.offcut_width >= opts.min_leftover && cut.offcut_width > 0),
            OffcutFate::Scrap => assert!(cut.offcut_width > 0 && cut.offcut_width < opts.min_leftover),
            OffcutFate::None => assert_eq!(cut.offcut_width, 0),
        }
    }
    let logged: u32 = plan.cut_log.iter().map(|c| c.sheets).sum();
    assert_eq!(logged, plan.sheet_count());

    for r in &plan.leftovers {
        assert!(r.width > 0 && r.width >= opts.min_leftover, "invalid remnant {:?}", r);
    }

    for ev in &plan.used_from_leftovers {
        let mut over_tolerance = false;
        for p in &ev.parts {
            assert!(p.length >= ev.length, "donor shorter than piece: {:?}", ev);
            assert!(p.width_used <= p.width_before);
            over_tolerance |= p.length - ev.length > opts.tolerance_l;
        }
        if over_tolerance {
            assert!(ev.uses_length_fallback, "fallback not flagged: {:?}", ev);
            assert!(opts.allow_fallback);
        }
        let used: u32 = ev.parts.iter().map(|p| p.width_used).sum();
        assert_eq!(used + ev.missing, ev.width, "event does not cover its width: {:?}", ev);

        let anti = &opts.anti;
        if anti.enabled && anti.limit_merge_b.is_some_and(|limit| ev.width > limit) {
            let foreign = ev.parts.iter().filter(|p| p.length != ev.length).count();
            assert!(
                foreign <= anti.max_merge_k.unwrap_or(0) as usize,
                "donor cap exceeded: {:?}",
                ev
            );
        }
        if ev.missing > 0 {
            assert!(anti.last_no_cut_b.is_some_and(|limit| ev.missing <= limit));
        }
    }
}

#[test]
fn test_random_plans_hold_invariants() {
    let mut rng = Lcg(0x5eed);
    for opts in option_grid() {
        for _ in 0..3 {
            let orders = random_orders(&mut rng, 8);
            let plan = calculate_cuts(&orders, &opts)
                .unwrap_or_else(|e| panic!("{} for orders {:?}", e, orders));
            assert_plan_invariants(&plan, &opts);
        }
    }
}

#[test]
fn test_calculation_is_deterministic() {
    let mut rng = Lcg(42);
    let orders = random_orders(&mut rng, 12);
    let opts = CutOptions {
        allow_fallback: true,
        min_leftover: 60,
        ..CutOptions::default()
    };
    let a = calculate_cuts(&orders, &opts).unwrap();
    let b = calculate_cuts(&orders, &opts).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_every_piece_accounted_for() {
    // Without policies, every native piece is either cut or closed.
    let mut rng = Lcg(7);
    let opts = CutOptions::default();
    for _ in 0..10 {
        let orders: Vec<Order> = random_orders(&mut rng, 8)
            .into_iter()
            .map(|mut o| {
                o.width = o.width.min(1000);
                o
            })
            .collect();
        let plan = calculate_cuts(&orders, &opts).unwrap();
        let ordered: i64 = orders.iter().map(|o| o.count).sum();
        let cut: u32 = plan.sheet_usage.iter().flat_map(|g| &g.items).map(|i| i.count).sum();
        let closed: u32 = plan.used_from_leftovers.iter().map(|u| u.count).sum();
        assert_eq!(ordered, (cut + closed) as i64);
    }
}

#[test]
fn test_normalization_is_idempotent() {
    let input = [
        ValidOrder { length: 2500, width: 1200, count: 1 },
        ValidOrder { length: 2500, width: 300, count: 2 },
        ValidOrder { length: 1800, width: 3400, count: 3 },
    ];
    let (once, _) = normalize(&input, 1000);
    let again: Vec<ValidOrder> = once
        .iter()
        .map(|r| ValidOrder {
            length: r.length,
            width: r.width,
            count: r.count,
        })
        .collect();
    let (twice, _) = normalize(&again, 1000);
    assert_eq!(once.len(), twice.len());
    for (a, b) in once.iter().zip(&twice) {
        assert_eq!((a.length, a.width, a.count), (b.length, b.width, b.count));
        assert_eq!(b.origin, Origin::Native);
    }
}

#[test]
fn test_scenario_a_two_sheets() {
    let orders = [Order::new(3000, 300, 5)];

    let keep = CutOptions {
        min_leftover: 100,
        ..CutOptions::new(1000)
    };
    let plan = calculate_cuts(&orders, &keep).unwrap();
    assert_eq!(plan.sheets_for_length(3000), 2);
    assert!(plan.leftovers.iter().any(|r| r.length == 3000 && r.width == 100));

    let scrap = CutOptions {
        min_leftover: 101,
        ..CutOptions::new(1000)
    };
    let plan = calculate_cuts(&orders, &scrap).unwrap();
    assert_eq!(plan.sheets_for_length(3000), 2);
    assert!(plan.leftovers.iter().all(|r| r.width != 100));
    assert!(plan.scrap_produced.iter().any(|s| s.length == 3000 && s.width == 100));
}

#[test]
fn test_scenario_b_tail_cut_separately() {
    let (rows, _) = normalize(&[ValidOrder { length: 2500, width: 1200, count: 1 }], 1000);
    let shape: Vec<(Origin, u32, u32, u32)> = rows
        .iter()
        .map(|r| (r.origin, r.width, r.count, r.strips))
        .collect();
    assert_eq!(
        shape,
        vec![(Origin::SplitFull, 1000, 1, 1), (Origin::SplitRest, 200, 1, 1)]
    );

    let plan = calculate_cuts(&[Order::new(2500, 1200, 1)], &CutOptions::new(1000)).unwrap();
    assert_eq!(plan.sheets_for_length(2500), 2);
    let full = plan
        .cut_log
        .iter()
        .find(|c| c.items[0].width == 1000)
        .expect("full-width strip cut");
    assert_eq!(full.offcut, OffcutFate::None);
    let tail = plan
        .cut_log
        .iter()
        .find(|c| c.items[0].width == 200)
        .expect("tail cut");
    assert_eq!(tail.items[0].count, 1);
    assert_eq!(tail.offcut_width, 800);
    assert!(plan.leftovers.iter().any(|r| r.width == 800));
}

#[test]
fn test_scenario_c_forced_rows() {
    let opts = CutOptions {
        anti: AntiWaste {
            enabled: true,
            min_l_no_cut: Some(450),
            ..AntiWaste::default()
        },
        ..CutOptions::new(1000)
    };
    let plan = calculate_cuts(&[Order::new(400, 500, 3)], &opts).unwrap();
    assert_eq!(plan.forced_map.get("400x500"), Some(&3));
    assert!(plan.sheet_usage.iter().all(|g| g.length != 400));
}

#[test]
fn test_scenario_d_wanted_tail() {
    let opts = CutOptions {
        tail_wanted_b: 150,
        ..CutOptions::new(1000)
    };
    let plan = calculate_cuts(&[Order::new(2500, 1120, 4)], &opts).unwrap();
    assert_eq!(
        plan.scrap_needs,
        vec![ScrapNeed {
            length: 2500,
            rest_b: 120,
            count: 4,
            k: 1
        }]
    );
    assert_eq!(plan.sheet_count(), 4, "only the full-width strips are cut");
    assert!(plan.cut_log.iter().all(|c| c.items.iter().all(|i| i.width != 120)));
    assert_eq!(plan.wanted_scrap_b, 150);
}
