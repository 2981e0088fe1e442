//! Full shielded-pool lifecycle: deposit, private transfer, withdrawal,
//! encrypted note hand-off, and a persistence round-trip.
//!
//! Run with `RUST_LOG=info cargo run --example lifecycle`.

use std::sync::Arc;

use rand::RngCore;
use velum_pool::{PoolConfig, ShieldedPool, TranscriptProver, derive_recipient_secret};
use velum_privacy::{ConfidentialNote, PoseidonHasher, encrypt_note, try_decrypt_note};
use x25519_dalek::{PublicKey, StaticSecret};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("============================================================");
    println!("Velum Shielded Pool Demo");
    println!("============================================================");

    let mut pool = ShieldedPool::new(PoolConfig::default());

    // Alice's secret (random)
    let mut alice_secret = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut alice_secret);
    println!(
        "\n1. Alice's secret: 0x{}...",
        &hex::encode(alice_secret)[..16]
    );

    // Alice deposits 100M units
    let deposit = pool.deposit(100_000_000, alice_secret)?;
    println!("\n2. Alice deposits 100_000_000");
    println!("   Note commitment: {}", deposit.commitment);
    println!("   Merkle root:     0x{}", hex::encode(deposit.new_root));

    println!("\n3. Alice's balance: {}", pool.balance_of(&alice_secret).total);

    // Alice transfers 40M to Bob
    println!("\n4. Alice transfers 40_000_000 to bob");
    let transfer = pool.transfer(deposit.commitment, "bob", 40_000_000, alice_secret)?;
    println!("   Nullifier published: {}", transfer.nullifier);
    println!("   New merkle root:     0x{}", hex::encode(transfer.new_root));

    let bob_secret = derive_recipient_secret("bob");
    println!("\n5. Alice's balance: {}", pool.balance_of(&alice_secret).total);
    println!("   Bob's balance:   {}", pool.balance_of(&bob_secret).total);

    // A note travels to its recipient encrypted to an X25519 key;
    // the recipient scans by trial decryption against the commitment.
    let hasher = PoseidonHasher::new();
    let bob_sk = StaticSecret::random_from_rng(&mut rand::thread_rng());
    let bob_pk = PublicKey::from(&bob_sk);
    let courier = ConfidentialNote::create(40_000_000, bob_secret)?;
    let encrypted = encrypt_note(&courier, bob_pk.as_bytes(), Some(b"for bob"));
    let scanned = try_decrypt_note(
        &encrypted,
        bob_sk.as_bytes(),
        &courier.commitment(&hasher),
        &hasher,
    );
    println!("\n6. Encrypted note scan succeeded: {}", scanned.is_some());

    // Bob withdraws his pool note
    let bob_commitment = pool.balance_of(&bob_secret).commitments[0];
    let withdrawal = pool.withdraw(bob_commitment, bob_secret, "0xbob")?;
    println!(
        "\n7. Bob withdrew {} to {}",
        withdrawal.amount, withdrawal.recipient
    );

    // Integrity + persistence round-trip
    let report = pool.verify_integrity();
    println!(
        "\n8. Pool integrity: {}",
        if report.valid { "VALID" } else { "ISSUES" }
    );
    println!("   Total notes:      {}", report.note_count);
    println!("   Spent nullifiers: {}", report.nullifier_count);

    let doc = pool.export_state();
    let restored = ShieldedPool::import_state(
        &doc,
        Arc::new(PoseidonHasher::new()),
        Arc::new(TranscriptProver),
    )?;
    println!(
        "\n9. Restored pool root matches: {}",
        restored.root() == pool.root()
    );

    println!("\n============================================================");
    println!("Demo complete. In a deployment the spend proofs would come");
    println!("from a real proving system injected behind SpendProver.");
    println!("============================================================");

    Ok(())
}
