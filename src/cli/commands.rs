//! CLI commands for the relay
//!
//! Payloads travel between parties as files of hex text. Whatever moves
//! those files (mail, chat, a shared drive) is the out-of-band channel.

use crate::config::RelayConfig;
use crate::core::{programs, Instruction, RecencyAnchor, Transaction, TransactionBuilder};
use crate::crypto::{Address, Hash, KeyPair};
use crate::keystore::{FileKeyStore, KeyStore, MemoryKeyStore};
use crate::ledger::{recovery_action, LedgerRpc, Outcome, SimulatedLedger};
use crate::multisig::{AuthorityRegistry, RequiredSigner};
use crate::protocol::{durable_anchor, Cosigner};
use crate::relay::{self, await_payload, Expectation, RelayFrameCodec};
use chrono::Utc;
use futures::SinkExt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
pub struct AppState {
    pub config: RelayConfig,
    pub keys: FileKeyStore,
    pub registry: AuthorityRegistry,
}

impl AppState {
    /// Open the key directory and load the authority registry
    pub fn new(config: RelayConfig) -> CliResult<Self> {
        let keys = FileKeyStore::new(&config.keys_dir())?;
        let registry = AuthorityRegistry::load(&config.registry_path())?;
        Ok(Self {
            config,
            keys,
            registry,
        })
    }

    pub fn save_registry(&self) -> CliResult<()> {
        self.registry.save(&self.config.registry_path())?;
        Ok(())
    }

    /// An address given literally, or the address of a named key
    pub fn resolve(&self, party: &str) -> CliResult<Address> {
        if let Ok(address) = Address::from_str(party) {
            return Ok(address);
        }
        Ok(self.keys.lookup(party)?.address())
    }
}

/// Anchor options for `build`
pub struct AnchorArgs {
    pub blockhash: Option<String>,
    pub nonce: Option<String>,
    pub nonce_value: Option<String>,
    pub nonce_authority: Option<String>,
}

/// Transfer options for `build transfer`
pub struct TransferArgs {
    pub from: String,
    pub to: String,
    pub amount: u64,
    pub fee_payer: String,
    pub memo: Option<String>,
}

fn read_payload(path: &Path) -> CliResult<Vec<u8>> {
    let text = fs::read_to_string(path)?;
    Ok(hex::decode(text.trim())?)
}

fn write_payload(path: &Path, tx: &Transaction) -> CliResult<()> {
    fs::write(path, hex::encode(relay::to_relay_payload(tx)))?;
    Ok(())
}

fn describe_required(required: &RequiredSigner) -> String {
    match required {
        RequiredSigner::Key(address) => address.to_string(),
        RequiredSigner::Threshold(authority) => format!(
            "{} ({} of members)",
            authority.address(),
            authority.description()
        ),
    }
}

fn print_readiness(cosigner: &Cosigner<'_>, tx: &Transaction) {
    if cosigner.is_ready(tx) {
        println!("   ✅ All required signatures present, ready to broadcast");
    } else {
        println!("   ⏳ Waiting on:");
        for required in cosigner.outstanding(tx) {
            println!("      - {}", describe_required(&required));
        }
    }
}

// =============================================================================
// Keys
// =============================================================================

/// Create a new named key
pub fn cmd_keys_new(state: &AppState, name: &str) -> CliResult<()> {
    let key = state.keys.create(name)?;

    println!("🔐 New key created!");
    println!("   🏷️  Name: {}", name);
    println!("   📍 Address: {}", key.address());

    Ok(())
}

/// List stored keys
pub fn cmd_keys_list(state: &AppState) -> CliResult<()> {
    let keys = state.keys.list()?;

    if keys.is_empty() {
        println!("📭 No keys found. Create one with: cosign keys new <name>");
        return Ok(());
    }

    println!("🔑 Keys ({}):", keys.len());
    for info in keys {
        println!("   {:<16} {}", info.name, info.address);
    }

    Ok(())
}

// =============================================================================
// Multisig
// =============================================================================

/// Register an M-of-N authority
pub fn cmd_multisig_create(
    state: &mut AppState,
    threshold: u8,
    members: &[String],
    label: Option<String>,
) -> CliResult<()> {
    let members = members
        .iter()
        .map(|m| state.resolve(m))
        .collect::<CliResult<Vec<_>>>()?;
    let authority = state.registry.create(threshold, members, label)?.clone();
    state.save_registry()?;

    println!("🔐 Multisig authority created!");
    println!("   📍 Address: {}", authority.address());
    println!("   🔢 Type: {}", authority.description());
    if let Some(label) = &authority.label {
        println!("   🏷️  Label: {}", label);
    }
    for member in authority.members() {
        println!("   👤 {}", member);
    }

    Ok(())
}

/// Show one authority, or list all of them
pub fn cmd_multisig_show(state: &AppState, address: Option<&str>) -> CliResult<()> {
    if let Some(address) = address {
        let authority = state.registry.require(&Address::from_str(address)?)?;
        println!("🔐 Multisig {}", authority.address());
        println!("   🔢 Type: {}", authority.description());
        if let Some(label) = &authority.label {
            println!("   🏷️  Label: {}", label);
        }
        for member in authority.members() {
            println!("   👤 {}", member);
        }
        return Ok(());
    }

    if state.registry.is_empty() {
        println!("📭 No multisig authorities registered");
        return Ok(());
    }
    println!("🔐 Multisig authorities ({}):", state.registry.len());
    for authority in state.registry.list() {
        println!(
            "   {} {:<6} {}",
            authority.address(),
            authority.description(),
            authority.label.as_deref().unwrap_or("")
        );
    }

    Ok(())
}

// =============================================================================
// Build, sign, inspect
// =============================================================================

fn anchor_from_args(state: &AppState, args: &AnchorArgs) -> CliResult<RecencyAnchor> {
    match (&args.nonce, &args.blockhash) {
        (Some(nonce), None) => {
            let value = args
                .nonce_value
                .as_deref()
                .ok_or("--nonce requires --nonce-value")?;
            let authority = args
                .nonce_authority
                .as_deref()
                .ok_or("--nonce requires --nonce-authority")?;
            Ok(RecencyAnchor::durable(
                state.resolve(nonce)?,
                Hash::from_str(value)?,
                state.resolve(authority)?,
            ))
        }
        (None, Some(blockhash)) => Ok(RecencyAnchor::ephemeral(
            Hash::from_str(blockhash)?,
            Utc::now(),
        )),
        (Some(_), Some(_)) => Err("choose either --blockhash or --nonce, not both".into()),
        (None, None) => Err("an anchor is required: --blockhash or --nonce".into()),
    }
}

/// Build an unsigned transfer and write its payload
pub fn cmd_build_transfer(
    state: &AppState,
    transfer: &TransferArgs,
    anchor: &AnchorArgs,
    out: &Path,
) -> CliResult<()> {
    let from = state.resolve(&transfer.from)?;
    let to = state.resolve(&transfer.to)?;
    let fee_payer = state.resolve(&transfer.fee_payer)?;
    let anchor = anchor_from_args(state, anchor)?;

    let mut instructions: Vec<Instruction> = vec![programs::transfer(&from, &to, transfer.amount)];
    if let Some(memo) = &transfer.memo {
        instructions.push(programs::memo(memo, &[from]));
    }

    let tx = TransactionBuilder::new(fee_payer)
        .durable_anchor(anchor)
        .add_instructions(instructions)
        .build()?;
    write_payload(out, &tx)?;

    let cosigner = Cosigner::new(&state.registry);
    println!("🧱 Transaction built!");
    println!("   🔖 Message: {}", tx.message().digest());
    println!("   ⚓ Anchor: {}", anchor.kind());
    println!("   💸 {} → {}: {}", from.short(), to.short(), transfer.amount);
    println!("   ⛽ Fee payer: {}", fee_payer);
    println!("   📄 Payload: {:?}", out);
    print_readiness(&cosigner, &tx);

    Ok(())
}

/// Checks the signer demands before countersigning
pub struct ExpectArgs {
    pub fee_payer: Option<String>,
    /// Payload whose message must match exactly
    pub like: Option<std::path::PathBuf>,
    /// Sign without any structural expectation
    pub no_verify: bool,
}

/// Verify a payload and add a signature
pub fn cmd_sign(
    state: &AppState,
    input: &Path,
    key_name: &str,
    expect: &ExpectArgs,
    out: Option<&Path>,
) -> CliResult<()> {
    let key = state.keys.lookup(key_name)?;
    let payload = read_payload(input)?;

    let mut expected = match &expect.like {
        Some(path) => {
            let reference = relay::from_relay_payload(&read_payload(path)?)?;
            Expectation::exact(reference.message())
        }
        None => Expectation::new(),
    };
    if let Some(fee_payer) = &expect.fee_payer {
        expected = expected.fee_payer(state.resolve(fee_payer)?);
    }
    if expected.is_empty() && !expect.no_verify {
        println!("❌ Refusing to sign: nothing to check the payload against");
        return Err("pass --expect-like or --expect-fee-payer (or --no-verify)".into());
    }

    let cosigner = Cosigner::new(&state.registry);
    let signed = match cosigner.countersign(&payload, &expected, &key) {
        Ok(signed) => signed,
        Err(e) => {
            println!("❌ Refusing to sign: {}", e);
            return Err(e.into());
        }
    };

    let out = out.unwrap_or(input);
    write_payload(out, &signed)?;

    println!("✍️  Signed as {} ({})", key_name, key.address().short());
    println!("   🔖 Message: {}", signed.message().digest());
    println!("   ✒️  Signatures: {}", signed.signature_count());
    println!("   📄 Payload: {:?}", out);
    print_readiness(&cosigner, &signed);

    Ok(())
}

/// Show what a payload contains
pub fn cmd_inspect(state: &AppState, input: &Path) -> CliResult<()> {
    let tx = relay::from_relay_payload(&read_payload(input)?)?;
    let message = tx.message();
    let cosigner = Cosigner::new(&state.registry);

    println!("🔍 Transaction {}", message.digest());
    println!("   ⛽ Fee payer: {}", message.fee_payer());
    match message.anchor() {
        RecencyAnchor::Ephemeral { blockhash, .. } => {
            let issued = message.anchor().issued_at().map(|t| t.to_rfc3339());
            println!(
                "   ⚓ Ephemeral anchor {} (issued {})",
                blockhash,
                issued.as_deref().unwrap_or("?")
            );
            let window = state.config.ephemeral_window_chrono();
            if !message.anchor().is_valid_within(Utc::now(), window) {
                println!("   ⚠️  Anchor window has elapsed; rebuild before signing");
            }
        }
        RecencyAnchor::Durable {
            nonce_account,
            value,
            authority,
        } => {
            println!("   ⚓ Durable anchor {}", value);
            println!("      nonce account: {}", nonce_account);
            println!("      authority:     {}", authority);
        }
    }

    println!("   📋 Instructions ({}):", message.instructions().len());
    for (i, instruction) in message.instructions().iter().enumerate() {
        println!(
            "      {}. program {} ({} bytes of data)",
            i + 1,
            instruction.program_id().short(),
            instruction.data().len()
        );
        for meta in instruction.accounts() {
            println!(
                "         {} {}{}",
                meta.address,
                if meta.is_signer() { "s" } else { "-" },
                if meta.is_writable() { "w" } else { "-" }
            );
        }
    }

    println!("   ✒️  Signatures ({}):", tx.signature_count());
    for address in tx.signatures().keys() {
        println!("      ✓ {}", address);
    }
    print_readiness(&cosigner, &tx);

    // Point out which of the missing signatures a local key could supply
    for required in cosigner.outstanding(&tx) {
        let candidates: Vec<Address> = match &required {
            RequiredSigner::Key(address) => vec![*address],
            RequiredSigner::Threshold(authority) => authority
                .members()
                .iter()
                .filter(|member| !tx.is_signed_by(member))
                .copied()
                .collect(),
        };
        for address in candidates {
            if let Some((name, _)) = state.keys.find_by_address(&address)? {
                println!(
                    "   🔑 Local key '{}' can sign for {}",
                    name,
                    required.address().short()
                );
            }
        }
    }

    Ok(())
}

// =============================================================================
// Demo
// =============================================================================

async fn demo_delegated_fee(ledger: &SimulatedLedger, config: &RelayConfig) -> CliResult<()> {
    println!("\n💸 Delegated fee: A sends 100 to B, B pays the fee");

    let mut store = MemoryKeyStore::new();
    let a = store.generate("alice")?;
    let b = store.generate("bob")?;
    ledger.fund(&a, 1_000).await;
    ledger.fund(&b, 100_000).await;

    let registry = AuthorityRegistry::new();
    let cosigner = Cosigner::new(&registry);
    let anchor = ledger.get_recent_anchor().await?;
    let tx = TransactionBuilder::new(b)
        .anchor(anchor)
        .add_instruction(programs::transfer(&a, &b, 100))
        .build()?;

    let partial = cosigner.sign_as(&tx, &store, "alice")?;
    println!("   ✍️  Alice signed, ready: {}", cosigner.is_ready(&partial));
    let payload = cosigner.to_relay_payload(&partial);
    println!("   📦 Handed off {} bytes", payload.len());

    let bob = store.lookup("bob")?;
    let complete = cosigner.countersign(&payload, &Expectation::exact(tx.message()), &bob)?;
    println!("   ✍️  Bob countersigned, ready: {}", cosigner.is_ready(&complete));

    let (_, outcome) = cosigner
        .broadcast_and_confirm(ledger, &complete, config.confirm_timeout)
        .await?;
    println!("   📡 Outcome: {:?}", outcome);
    println!(
        "   💰 Balances: alice {}, bob {}",
        ledger.balance(&a).await,
        ledger.balance(&b).await
    );
    Ok(())
}

async fn demo_durable_nonce(ledger: &SimulatedLedger, config: &RelayConfig) -> CliResult<()> {
    println!("\n⚓ Durable nonce: signatures outlive the blockhash window");

    let payer = KeyPair::generate();
    ledger.fund(&payer.address(), 100_000).await;
    let nonce = ledger.create_nonce_account(&payer.address()).await;

    let registry = AuthorityRegistry::new();
    let cosigner = Cosigner::new(&registry);
    let build = |anchor: RecencyAnchor| -> CliResult<Transaction> {
        let tx = TransactionBuilder::new(payer.address())
            .durable_anchor(anchor)
            .add_instruction(programs::memo("durable demo", &[payer.address()]))
            .build()?;
        Ok(cosigner.sign(&tx, &payer)?)
    };

    let v1 = durable_anchor(ledger, &nonce, &payer.address()).await?;
    let signed = build(v1)?;
    println!("   ✍️  Signed against nonce value {}", v1.recent_hash());

    let competing = ledger.advance_nonce(&nonce).await?;
    println!("   ⚔️  A competing transaction advanced the nonce to {}", competing);

    let (_, outcome) = cosigner
        .broadcast_and_confirm(ledger, &signed, config.confirm_timeout)
        .await?;
    println!("   📡 Outcome: {:?}", outcome);

    if outcome == Outcome::Expired {
        let action = recovery_action(
            ledger,
            &v1,
            ledger.now().await,
            config.ephemeral_window_chrono(),
        )
        .await?;
        println!("   🔁 Recovery: {:?}", action);

        let v2 = durable_anchor(ledger, &nonce, &payer.address()).await?;
        let (_, outcome) = cosigner
            .broadcast_and_confirm(ledger, &build(v2)?, config.confirm_timeout)
            .await?;
        println!("   📡 Rebuilt against {}: {:?}", v2.recent_hash(), outcome);
    }
    Ok(())
}

async fn demo_multisig(ledger: &SimulatedLedger, config: &RelayConfig) -> CliResult<()> {
    println!("\n🔐 Multisig: 2-of-3 treasury pays, X and Y sign, Z never does");

    let (x, y, z) = (KeyPair::generate(), KeyPair::generate(), KeyPair::generate());
    let mut registry = AuthorityRegistry::new();
    let authority = registry
        .create(
            2,
            vec![x.address(), y.address(), z.address()],
            Some("treasury".to_string()),
        )?
        .clone();
    let treasury = *authority.address();
    ledger.register_authority(authority).await;
    ledger.fund(&treasury, 1_000_000).await;

    let recipient = KeyPair::generate().address();
    let cosigner = Cosigner::new(&registry);
    let tx = TransactionBuilder::new(treasury)
        .anchor(ledger.get_recent_anchor().await?)
        .add_instruction(programs::transfer(&treasury, &recipient, 25_000))
        .build()?;

    let by_x = cosigner.sign(&tx, &x)?;
    println!("   ✍️  X signed, ready: {}", cosigner.is_ready(&by_x));

    // X and Y never talk directly; the payload crosses a framed stream
    let (x_end, y_end) = tokio::io::duplex(64 * 1024);
    let mut to_y = Framed::new(x_end, RelayFrameCodec);
    let mut from_x = Framed::new(y_end, RelayFrameCodec);
    to_y.send(cosigner.to_relay_payload(&by_x)).await?;

    let (_abandon, mut cancel) = mpsc::channel::<()>(1);
    let payload = await_payload(&mut from_x, config.handoff_timeout, &mut cancel).await?;
    let received = cosigner.from_relay_payload(&payload)?;
    let by_y = cosigner.sign(&received, &y)?;
    println!("   ✍️  Y signed independently, ready: {}", cosigner.is_ready(&by_y));

    let (_, outcome) = cosigner
        .broadcast_and_confirm(ledger, &by_y, config.confirm_timeout)
        .await?;
    println!("   📡 Outcome: {:?}", outcome);
    println!("   💰 Recipient balance: {}", ledger.balance(&recipient).await);
    Ok(())
}

/// Run every flow end to end against an in-memory ledger
pub async fn cmd_demo(config: &RelayConfig) -> CliResult<()> {
    let ledger = SimulatedLedger::new()
        .with_validity_window(config.ephemeral_window)
        .with_poll_interval(config.poll_interval);

    println!("🚀 Running cosign demo against a simulated ledger");
    demo_delegated_fee(&ledger, config).await?;
    demo_durable_nonce(&ledger, config).await?;
    demo_multisig(&ledger, config).await?;
    println!("\n✅ Demo complete");

    Ok(())
}
