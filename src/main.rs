//! Perpetual ledger simulation.
//!
//! Walks the ledger through its lifecycle: listing a market, opening and closing
//! positions, funding accrual, liquidation, and failure handling.

use perps_ledger::*;
use rust_decimal_macros::dec;

type SimLedger = PositionLedger<StaticPriceFeed, InMemoryCustody>;

const HOUR: i64 = 3_600_000;
const FEE_COLLECTOR: AccountId = AccountId(1_000);

fn main() -> Result<(), LedgerError> {
    println!("Perpetual Ledger Simulation");
    println!("Isolated Margin, Oracle Pricing, Index Funding\n");

    scenario_1_open_and_close()?;
    scenario_2_funding_accrual()?;
    scenario_3_liquidation_cascade()?;
    scenario_4_chain_profiles()?;
    scenario_5_failure_leaves_no_trace()?;

    println!("\nAll simulations completed successfully.");
    Ok(())
}

fn btc() -> OracleRef {
    OracleRef::new("BTC/USD")
}

fn new_ledger(chain: ChainConfig, price: rust_decimal::Decimal) -> Result<SimLedger, LedgerError> {
    let mut ledger = PositionLedger::new(
        chain.with_fee_collector(FEE_COLLECTOR),
        LedgerConfig::default(),
        StaticPriceFeed::new().with_price(&btc(), price),
        InMemoryCustody::new(),
    )?;

    ledger.add_market(
        MarketId(1),
        NewMarket {
            oracle: btc(),
            min_collateral: Quote::new(dec!(10)),
            max_leverage: 20,
            maintenance_margin_bps: 500,
        },
    )?;
    Ok(ledger)
}

/// A profitable long from open to close.
fn scenario_1_open_and_close() -> Result<(), LedgerError> {
    println!("Scenario 1: Open and Close\n");

    let mut ledger = new_ledger(ChainConfig::default(), dec!(1000))?;
    ledger.set_time(Timestamp::now());
    let alice = AccountId(1);
    ledger.custody_mut().fund(alice, dec!(1_000));
    ledger.custody_mut().seed_vault(dec!(10_000));

    let id = ledger.open(OpenRequest::new(MarketId(1), alice, Direction::Long, Quote::new(dec!(100)), 5))?;
    let pos = ledger.position(id).ok_or(LedgerError::PositionNotFound(id))?;
    println!("  Alice opens {} long {} @ ${} ({}x)", id, pos.size, pos.entry_price, pos.leverage);

    ledger.pricing_mut().set_price(&btc(), dec!(1100));
    let view = ledger.position_view(id)?;
    println!("  Price moves to ${}, unrealized PnL ${}", view.current_price, view.unrealized_pnl);

    let result = ledger.close(id, alice)?;
    println!("  Closed: pnl ${}, fee ${}, payout ${}", result.pnl, result.fee, result.payout);
    println!("  Alice wallet: ${}\n", ledger.custody().wallet(alice));
    Ok(())
}

/// A long-heavy book pays funding to the short side.
fn scenario_2_funding_accrual() -> Result<(), LedgerError> {
    println!("Scenario 2: Funding Accrual\n");

    let mut ledger = new_ledger(ChainConfig::default(), dec!(1000))?;
    let (bull, bear) = (AccountId(1), AccountId(2));
    ledger.custody_mut().fund(bull, dec!(10_000));
    ledger.custody_mut().fund(bear, dec!(10_000));

    let long_id = ledger.open(OpenRequest::new(MarketId(1), bull, Direction::Long, Quote::new(dec!(1000)), 10))?;
    let short_id = ledger.open(OpenRequest::new(MarketId(1), bear, Direction::Short, Quote::new(dec!(500)), 10))?;

    if let Some((long_oi, short_oi)) = ledger.open_interest(MarketId(1)) {
        println!("  Open interest: {} long, {} short", long_oi, short_oi);
    }

    for hour in 1..=24 {
        ledger.set_time(Timestamp::from_millis(hour * HOUR));
        ledger.update_funding_now(MarketId(1))?;
    }

    if let Some(market) = ledger.market(MarketId(1)) {
        println!("  Net open interest: {}", market.net_open_interest());
        println!("  After 24 intervals, funding index: {}", market.cumulative_funding_index);
    }
    println!("  Long owes ${}", ledger.position_view(long_id)?.funding_owed);
    println!("  Short owes ${}", ledger.position_view(short_id)?.funding_owed);

    match ledger.update_funding_now(MarketId(1)) {
        Err(e) => println!("  Repeat update in the same interval: {}\n", e),
        Ok(_) => println!("  Repeat update unexpectedly accepted\n"),
    }
    Ok(())
}

/// A sharp drop takes out the most leveraged longs first.
fn scenario_3_liquidation_cascade() -> Result<(), LedgerError> {
    println!("Scenario 3: Liquidation Cascade\n");

    let mut ledger = new_ledger(ChainConfig::default(), dec!(1000))?;
    let keeper = AccountId(99);

    for (n, leverage) in [2u16, 5, 10, 15, 20].into_iter().enumerate() {
        let trader = AccountId(n as u64 + 1);
        ledger.custody_mut().fund(trader, dec!(1_000));
        let id = ledger.open(OpenRequest::new(MarketId(1), trader, Direction::Long, Quote::new(dec!(100)), leverage))?;
        let view = ledger.position_view(id)?;
        match view.estimated_liquidation_price {
            Some(price) => println!("  {} {}x long, liquidation near ${}", id, leverage, price),
            None => println!("  {} {}x long, no liquidation price", id, leverage),
        }
    }

    for price in [dec!(980), dec!(950), dec!(920), dec!(870), dec!(700)] {
        ledger.pricing_mut().set_price(&btc(), price);
        let candidates = ledger.liquidation_candidates(MarketId(1))?;
        for id in candidates {
            let result = ledger.liquidate(id, keeper)?;
            println!("  ${}: liquidated {} (equity ${}, keeper fee ${})", price, id, result.equity, result.liquidator_fee);
        }
    }

    println!("  Survivors: {}", ledger.position_count());
    println!("  Keeper earned ${}\n", ledger.custody().wallet(keeper));
    Ok(())
}

/// Same trade on every supported chain.
fn scenario_4_chain_profiles() -> Result<(), LedgerError> {
    println!("Scenario 4: Chain Profiles\n");

    for profile in [ChainProfile::Solana, ChainProfile::Ethereum, ChainProfile::Arbitrum, ChainProfile::Bnb] {
        let chain = profile.config();
        let name = chain.name.clone();
        let mut ledger = new_ledger(chain, dec!(1000))?;
        let trader = AccountId(1);
        ledger.custody_mut().fund(trader, dec!(1_000));
        ledger.custody_mut().seed_vault(dec!(1_000));

        let id = ledger.open(OpenRequest::new(MarketId(1), trader, Direction::Short, Quote::new(dec!(100)), 10))?;
        ledger.pricing_mut().set_price(&btc(), dec!(990));
        let result = ledger.close(id, trader)?;
        println!("  {:<10} fee ${:<8} payout ${}", name, result.fee, result.payout);
    }
    println!();
    Ok(())
}

/// Custody and oracle failures leave the ledger untouched.
fn scenario_5_failure_leaves_no_trace() -> Result<(), LedgerError> {
    println!("Scenario 5: Failure Atomicity\n");

    let mut ledger = new_ledger(ChainConfig::default(), dec!(1000))?;
    let trader = AccountId(1);
    ledger.custody_mut().fund(trader, dec!(50));

    let events_before = ledger.events().len();
    match ledger.open(OpenRequest::new(MarketId(1), trader, Direction::Long, Quote::new(dec!(100)), 5)) {
        Err(e) => println!("  Underfunded open rejected ({:?}): {}", e.kind(), e),
        Ok(id) => println!("  Underfunded open unexpectedly created {}", id),
    }

    ledger.pricing_mut().remove_price(&btc());
    match ledger.open(OpenRequest::new(MarketId(1), trader, Direction::Long, Quote::new(dec!(10)), 5)) {
        Err(e) => println!("  Open without a price rejected ({:?}): {}", e.kind(), e),
        Ok(id) => println!("  Open without a price unexpectedly created {}", id),
    }

    println!("  Positions: {}, new events: {}", ledger.position_count(), ledger.events().len() - events_before);
    println!("  Trader wallet still ${}", ledger.custody().wallet(trader));
    Ok(())
}
