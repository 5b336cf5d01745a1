use elemental_core::{ManualClock, MemoryLedger, PlayerId};
use elemental_duel::{Commitment, DuelConfig, DuelRegistry, Move, Salt};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let ledger = Arc::new(MemoryLedger::new());
    let clock = Arc::new(ManualClock::starting_now());
    let registry = DuelRegistry::new(DuelConfig::default(), ledger.clone(), clock.clone())?;

    let alice = PlayerId::from("alice");
    let bob = PlayerId::from("bob");
    ledger.mint_mana(&alice, 10);
    ledger.mint_mana(&bob, 10);

    // Commit off-line
    let alice_salt = Salt::generate();
    let bob_salt = Salt::generate();
    let alice_commitment = Commitment::compute(&alice, Move::Rock, &alice_salt);
    let bob_commitment = Commitment::compute(&bob, Move::Scissors, &bob_salt);

    let duel_id = registry.start(alice.clone(), alice_commitment).await?;
    println!("Duel {} opened by {}", duel_id, alice);
    println!("Commitment: {}", alice_commitment);

    clock.advance_secs(120);
    registry.join(duel_id, bob.clone(), bob_commitment).await?;
    println!("{} joined", bob);

    registry
        .reveal(duel_id, alice.clone(), Move::Rock, alice_salt)
        .await?;
    registry
        .reveal(duel_id, bob.clone(), Move::Scissors, bob_salt)
        .await?;

    let info = registry.status(duel_id).await?;
    println!("\nState: {:?}", info.state);
    println!("Outcome: {:?}", info.outcome);

    println!("\nBalances:");
    println!("{}: {} mana, {} points", alice, ledger.balance(&alice), ledger.points(&alice));
    println!("{}: {} mana, {} points", bob, ledger.balance(&bob), ledger.points(&bob));

    Ok(())
}
