//! VRF-based winner selection.
//!
//! The draw input binds the round number and the full ordered player list, so
//! no single entrant — in particular not the one whose deposit triggers
//! resolution — controls the entropy. The proving key belongs to the session
//! operator; anyone holding the [`DrawBundle`] can re-verify the draw.

use crate::errors::{SessionError, SessionResult};
use crate::types::Address;
use schnorrkel::{Keypair, PublicKey, Signature};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

const DRAW_SIGNING_CONTEXT: &[u8] = b"cardroom-draw";

/// Publicly verifiable record of one winner draw.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawBundle {
    /// Hex-encoded VRF output (32 bytes).
    pub vrf_output: String,
    /// Hex-encoded VRF proof (64-byte schnorrkel signature).
    pub vrf_proof: String,
    /// Hex-encoded operator public key (32 bytes).
    pub public_key: String,
    /// Input message the draw committed to.
    pub input_message: String,
}

pub struct OutcomeEngine {
    keypair: Arc<Keypair>,
}

impl OutcomeEngine {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    /// Engine with a freshly generated operator key.
    pub fn new_random() -> Self {
        use rand_core::OsRng;
        Self::new(Keypair::generate_with(OsRng))
    }

    /// Canonical draw input for a round: the round number plus every entrant
    /// in entry order.
    pub fn draw_input(round: u64, players: &[Address]) -> String {
        let list = players
            .iter()
            .map(|p| p.to_hex())
            .collect::<Vec<_>>()
            .join(",");
        format!("round:{}:players:{}", round, list)
    }

    /// Select a winner from the final player list.
    ///
    /// Returns the winner's index into `players` together with the audit
    /// bundle for the draw.
    pub fn draw_winner(
        &self,
        round: u64,
        players: &[Address],
    ) -> SessionResult<(usize, DrawBundle)> {
        if players.is_empty() {
            return Err(SessionError::DrawFailed("empty player list".to_string()));
        }

        let input_message = Self::draw_input(round, players);
        let (vrf_output, vrf_proof) = self.vrf_sign(input_message.as_bytes());
        let index = Self::winner_index(&vrf_output, players.len());

        let bundle = DrawBundle {
            vrf_output: hex::encode(vrf_output),
            vrf_proof: hex::encode(vrf_proof),
            public_key: hex::encode(self.keypair.public.to_bytes()),
            input_message,
        };

        Ok((index, bundle))
    }

    fn vrf_sign(&self, message: &[u8]) -> (Vec<u8>, Vec<u8>) {
        use schnorrkel::context::SigningContext;

        let ctx = SigningContext::new(DRAW_SIGNING_CONTEXT);
        let transcript = ctx.bytes(message);
        let signature = self.keypair.sign(transcript);

        // Output is the hash of the proof, so it is fixed once the proof is.
        let mut hasher = Sha256::new();
        hasher.update(signature.to_bytes());
        let vrf_output = hasher.finalize().to_vec();

        (vrf_output, signature.to_bytes().to_vec())
    }

    /// Map a VRF output onto a player index.
    pub fn winner_index(vrf_output: &[u8], player_count: usize) -> usize {
        let mut bytes = [0u8; 8];
        for (i, b) in vrf_output.iter().take(8).enumerate() {
            bytes[i] = *b;
        }
        (u64::from_be_bytes(bytes) % player_count as u64) as usize
    }

    /// Re-verify a draw bundle against the input it should have committed to.
    pub fn verify_draw(bundle: &DrawBundle, expected_input: &str) -> Result<bool, String> {
        if bundle.input_message != expected_input {
            return Ok(false);
        }

        let vrf_output = hex::decode(&bundle.vrf_output)
            .map_err(|e| format!("Invalid VRF output hex: {}", e))?;
        let vrf_proof = hex::decode(&bundle.vrf_proof)
            .map_err(|e| format!("Invalid VRF proof hex: {}", e))?;
        let public_key_bytes = hex::decode(&bundle.public_key)
            .map_err(|e| format!("Invalid public key hex: {}", e))?;

        let public_key_array: [u8; 32] = public_key_bytes
            .try_into()
            .map_err(|_| "Public key must be 32 bytes")?;
        let public_key = PublicKey::from_bytes(&public_key_array)
            .map_err(|e| format!("Invalid public key: {:?}", e))?;

        let signature_array: [u8; 64] = vrf_proof
            .try_into()
            .map_err(|_| "Proof must be 64 bytes")?;
        let signature = Signature::from_bytes(&signature_array)
            .map_err(|e| format!("Invalid signature: {:?}", e))?;

        use schnorrkel::context::SigningContext;
        let ctx = SigningContext::new(DRAW_SIGNING_CONTEXT);
        let transcript = ctx.bytes(expected_input.as_bytes());
        if public_key.verify(transcript, &signature).is_err() {
            return Ok(false);
        }

        let mut hasher = Sha256::new();
        hasher.update(signature_array);
        let computed_output = hasher.finalize();

        Ok(computed_output.as_slice() == vrf_output.as_slice())
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.keypair.public.to_bytes())
    }
}
