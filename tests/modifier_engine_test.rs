// ==========================================
// 需求修正器引擎集成测试
// ==========================================
// 职责: 验证四类修正器的固定优先级、促销择一、σ 夹取
//       与日期锚定/跳过告警的组合行为
// ==========================================

use chrono::NaiveDate;
use retail_replenish::domain::demand::{DemandDistribution, ForecastMethod};
use retail_replenish::domain::modifier::{DemandModifier, ModifierHeader, ModifierKind};
use retail_replenish::domain::types::{
    ConfidenceTag, DateBasis, ModifierCategory, ModifierScope, StackingRule,
};
use retail_replenish::engine::ModifierEngine;

// ==========================================
// 测试辅助函数
// ==========================================

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn base() -> DemandDistribution {
    DemandDistribution::new(100.0, 20.0, 3, ForecastMethod::MovingAverage)
}

fn build(
    name: &str,
    kind: ModifierKind,
    scope: ModifierScope,
    stacking: StackingRule,
    value: f64,
) -> DemandModifier {
    DemandModifier {
        header: ModifierHeader {
            name: name.to_string(),
            scope,
            value,
            stacking,
            active_from: d("2025-06-01"),
            active_to: d("2025-06-30"),
            date_basis: DateBasis::OrderDate,
            confidence: ConfidenceTag::Medium,
            note: None,
        },
        kind,
    }
}

fn event(name: &str, scope: ModifierScope, value: f64) -> DemandModifier {
    build(
        name,
        ModifierKind::Event {
            event_type: "门店活动".to_string(),
        },
        scope,
        StackingRule::Multiplicative,
        value,
    )
}

fn promo(name: &str, value: f64) -> DemandModifier {
    build(
        name,
        ModifierKind::Promo {
            campaign_id: format!("CAMP-{}", name),
            discount_pct: None,
        },
        ModifierScope::Both,
        StackingRule::Multiplicative,
        value,
    )
}

fn cannibalization(name: &str, driver: &str, value: f64) -> DemandModifier {
    build(
        name,
        ModifierKind::Cannibalization {
            driver_sku: driver.to_string(),
        },
        ModifierScope::MuOnly,
        StackingRule::Multiplicative,
        value,
    )
}

fn holiday(name: &str, scope: ModifierScope, value: f64) -> DemandModifier {
    build(
        name,
        ModifierKind::Holiday {
            holiday_name: name.to_string(),
        },
        scope,
        StackingRule::Multiplicative,
        value,
    )
}

// ==========================================
// 测试1: 固定优先级, 与输入顺序无关
// ==========================================
#[test]
fn test_fixed_precedence_independent_of_input_order() {
    let engine = ModifierEngine::new();
    // 故意乱序投入: 节假日, 蚕食, 促销, 事件
    let candidates = vec![
        holiday("中秋回落", ModifierScope::Both, 0.8),
        cannibalization("新品抢量", "SKU-B02", 0.9),
        promo("满减促销", 1.5),
        event("店庆", ModifierScope::MuOnly, 1.2),
    ];

    let outcome = engine.apply(&base(), &candidates, Some(d("2025-06-11")), Some(d("2025-06-12")));

    let names: Vec<&str> = outcome.applied.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(
        names,
        ["店庆", "满减促销", "新品抢量", "中秋回落"],
        "应用顺序必须是 事件->促销->蚕食->节假日"
    );

    // μ 链: 100 ×1.2 ×1.5 ×0.9 ×0.8 = 129.6
    assert!((outcome.distribution.mu - 129.6).abs() < 1e-9);
    // σ 链只取 both/sigma 作用域: 1.5 × 0.8 = 1.2, 夹取区间内
    assert!((outcome.distribution.sigma - 24.0).abs() < 1e-9);
    assert_eq!(outcome.distribution.sigma_multiplier, Some(1.2));

    // 审计轨迹逐段衔接
    assert_eq!(outcome.applied[0].mu_before, 100.0);
    assert_eq!(outcome.applied[0].mu_after, 120.0);
    assert_eq!(outcome.applied[1].mu_after, 180.0);
    assert!((outcome.applied[2].mu_after - 162.0).abs() < 1e-9);
    assert!((outcome.applied[3].mu_after - 129.6).abs() < 1e-9);
}

// ==========================================
// 测试2: 促销择一, 偏离 1.0 最大者胜出
// ==========================================
#[test]
fn test_promo_max_deviation_wins() {
    let engine = ModifierEngine::new();
    let candidates = vec![promo("九五折", 1.2), promo("清仓五折", 0.5)];

    let outcome = engine.apply(&base(), &candidates, Some(d("2025-06-11")), None);

    assert_eq!(outcome.applied.len(), 1);
    assert_eq!(outcome.applied[0].name, "清仓五折", "|0.5-1| > |1.2-1|");
    assert!((outcome.distribution.mu - 50.0).abs() < 1e-9);
    assert!(
        outcome
            .warnings
            .iter()
            .any(|w| w.starts_with("SKIP_PROMO_NOT_SELECTED") && w.contains("九五折")),
        "落选促销应留告警: {:?}",
        outcome.warnings
    );
}

// ==========================================
// 测试3: 促销偏离并列时取输入序最早者
// ==========================================
#[test]
fn test_promo_tie_keeps_earliest() {
    let engine = ModifierEngine::new();
    // 1.3 与 0.7 偏离同为 0.3
    let candidates = vec![promo("加量促", 1.3), promo("降价促", 0.7)];

    let outcome = engine.apply(&base(), &candidates, Some(d("2025-06-11")), None);

    assert_eq!(outcome.applied.len(), 1);
    assert_eq!(outcome.applied[0].name, "加量促", "并列取输入序最早者");
    assert!((outcome.distribution.mu - 130.0).abs() < 1e-9);
}

// ==========================================
// 测试4: 加法口径折算为 (1 + value)
// ==========================================
#[test]
fn test_additive_value_converts_to_multiplier() {
    let engine = ModifierEngine::new();
    let lift = build(
        "会员日加量",
        ModifierKind::Event {
            event_type: "会员日".to_string(),
        },
        ModifierScope::MuOnly,
        StackingRule::Additive,
        0.25,
    );

    let outcome = engine.apply(&base(), &[lift], Some(d("2025-06-11")), None);

    assert_eq!(outcome.applied.len(), 1);
    assert!((outcome.applied[0].multiplier - 1.25).abs() < 1e-9);
    assert!((outcome.distribution.mu - 125.0).abs() < 1e-9);
}

// ==========================================
// 测试5: σ 只放大不缩小, 上限 2.5
// ==========================================
#[test]
fn test_sigma_clamp_floor_and_ceiling() {
    let engine = ModifierEngine::new();

    // 缩量促销: μ 减半, σ 乘积 0.5 被夹回 1.0
    let outcome = engine.apply(
        &base(),
        &[promo("缩量", 0.5)],
        Some(d("2025-06-11")),
        None,
    );
    assert!((outcome.distribution.mu - 50.0).abs() < 1e-9);
    assert!((outcome.distribution.sigma - 20.0).abs() < 1e-9, "σ 永不缩小");
    assert_eq!(outcome.distribution.sigma_multiplier, Some(1.0));

    // 两个 σ 作用域修正器: 2.0 × 1.6 = 3.2, 夹到 2.5
    let candidates = vec![
        event("波动放大", ModifierScope::Sigma, 2.0),
        holiday("不确定节", ModifierScope::Sigma, 1.6),
    ];
    let outcome = engine.apply(&base(), &candidates, Some(d("2025-06-11")), None);
    assert!((outcome.distribution.mu - 100.0).abs() < 1e-9, "Sigma 作用域不触碰 μ");
    assert!((outcome.distribution.sigma - 50.0).abs() < 1e-9, "20 × 2.5 = 50");
    assert_eq!(outcome.distribution.sigma_multiplier, Some(2.5));
}

// ==========================================
// 测试6: 到货日锚定与下单日锚定分别判窗
// ==========================================
#[test]
fn test_date_basis_anchoring() {
    let engine = ModifierEngine::new();

    // 窗口只覆盖到货日 (6-14), 不覆盖下单日 (6-11)
    let mut on_delivery = event("到货日促", ModifierScope::MuOnly, 1.4);
    on_delivery.header.active_from = d("2025-06-14");
    on_delivery.header.active_to = d("2025-06-14");
    on_delivery.header.date_basis = DateBasis::DeliveryDate;

    let mut on_order = event("下单日促", ModifierScope::MuOnly, 1.4);
    on_order.header.active_from = d("2025-06-14");
    on_order.header.active_to = d("2025-06-14");
    on_order.header.date_basis = DateBasis::OrderDate;

    let outcome = engine.apply(
        &base(),
        &[on_delivery, on_order],
        Some(d("2025-06-11")),
        Some(d("2025-06-14")),
    );

    // 到货日锚定命中, 下单日锚定窗口外静默不生效
    assert_eq!(outcome.applied.len(), 1);
    assert_eq!(outcome.applied[0].name, "到货日促");
    assert!(outcome.warnings.is_empty(), "窗口外不是告警: {:?}", outcome.warnings);
}

// ==========================================
// 测试7: 所需日期缺失时跳过并告警, 不换用另一日期
// ==========================================
#[test]
fn test_missing_anchor_date_skips_with_warning() {
    let engine = ModifierEngine::new();
    let mut m = event("到货日促", ModifierScope::MuOnly, 1.4);
    m.header.date_basis = DateBasis::DeliveryDate;

    // 窗口本身覆盖下单日, 但锚定要求到货日, 到货日未提供
    let outcome = engine.apply(&base(), &[m], Some(d("2025-06-11")), None);

    assert!(outcome.applied.is_empty());
    assert!((outcome.distribution.mu - 100.0).abs() < 1e-9, "μ 不受影响");
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].starts_with("SKIP_MISSING_DELIVERY_DATE"));
}

// ==========================================
// 测试8: 负系数修正器被拒, μ 永不为负
// ==========================================
#[test]
fn test_negative_multiplier_skipped() {
    let engine = ModifierEngine::new();
    let negative_mult = event("坏数据", ModifierScope::MuOnly, -0.5);
    let negative_add = build(
        "深跌事件",
        ModifierKind::Event {
            event_type: "坏数据".to_string(),
        },
        ModifierScope::MuOnly,
        StackingRule::Additive,
        -1.8, // 折算系数 -0.8
    );

    let outcome = engine.apply(
        &base(),
        &[negative_mult, negative_add],
        Some(d("2025-06-11")),
        None,
    );

    assert!(outcome.applied.is_empty());
    assert!((outcome.distribution.mu - 100.0).abs() < 1e-9);
    assert_eq!(outcome.warnings.len(), 2);
    assert!(outcome
        .warnings
        .iter()
        .all(|w| w.starts_with("SKIP_NEGATIVE_MULTIPLIER")));
}

// ==========================================
// 测试9: 数量修正器不进分布栈, 由独立入口返回
// ==========================================
#[test]
fn test_qty_correction_scope_separated() {
    let engine = ModifierEngine::new();
    let candidates = vec![
        event("正常事件", ModifierScope::MuOnly, 1.2),
        event("末端压缩", ModifierScope::QtyCorrection, 0.5),
    ];

    let outcome = engine.apply(&base(), &candidates, Some(d("2025-06-11")), None);
    assert_eq!(outcome.applied.len(), 1, "数量修正不进分布栈");
    assert_eq!(outcome.applied[0].name, "正常事件");
    assert!((outcome.distribution.mu - 120.0).abs() < 1e-9);

    let (corrections, warnings) =
        engine.active_qty_corrections(&candidates, Some(d("2025-06-11")), None);
    assert_eq!(corrections.len(), 1);
    assert_eq!(corrections[0].header.name, "末端压缩");
    assert!(warnings.is_empty());
}

// ==========================================
// 测试10: 生效类别正确落入审计项
// ==========================================
#[test]
fn test_applied_entries_carry_category_and_driver() {
    let engine = ModifierEngine::new();
    let candidates = vec![cannibalization("同类抢量", "SKU-DRIVER", 0.85)];

    let outcome = engine.apply(&base(), &candidates, Some(d("2025-06-11")), None);

    assert_eq!(outcome.applied.len(), 1);
    let entry = &outcome.applied[0];
    assert_eq!(entry.category, ModifierCategory::Cannibalization);
    assert_eq!(entry.driver_sku.as_deref(), Some("SKU-DRIVER"));
    assert!((entry.multiplier - 0.85).abs() < 1e-9);
}
