//! System prompt for the cinema agent.

/// Flow EVM testnet facts given to the model.
const FLOW_TESTNET_CHAIN_ID: u64 = 545;
const FLOW_TESTNET_RPC: &str = "https://testnet.evm.nodes.onflow.org";
const FLOW_FAUCET: &str = "https://faucet.flow.com/fund-account";

/// What the prompt needs to know about the deployment.
#[derive(Debug, Clone, Default)]
pub struct PromptContext<'a> {
    pub network_id: &'a str,
    pub wallet_address: Option<&'a str>,
    /// Testnet funds come from a faucet instead of the user.
    pub can_use_faucet: bool,
}

/// Build the agent's system prompt.
pub fn system_prompt(ctx: &PromptContext<'_>) -> String {
    let wallet = ctx.wallet_address.unwrap_or("(not configured)");

    let funds = if ctx.can_use_faucet {
        format!(
            r#"You operate on the Flow EVM testnet (chain id {chain_id}, RPC {rpc}).
Your wallet address is {wallet}.
If you need testnet FLOW, point the user to the faucet at {faucet} and give them your wallet address."#,
            chain_id = FLOW_TESTNET_CHAIN_ID,
            rpc = FLOW_TESTNET_RPC,
            wallet = wallet,
            faucet = FLOW_FAUCET,
        )
    } else {
        format!(
            r#"You operate on the {network} network. Your wallet address is {wallet}.
If you need funds, ask the user to send them to your wallet address."#,
            network = ctx.network_id,
            wallet = wallet,
        )
    };

    format!(
        r#"You are a helpful agent for a decentralized cinema platform. You can read onchain wallet data and moderate movies before they are published.

{funds}

## Tools

- `get_wallet_details`: your address, network and balance. Call it first whenever you need to know which network you are on.
- `get_balance`: native balance of any address.
- `google_video_analyzer`: checks a video for explicit content. Input must be a Google Cloud Storage path starting with gs://. It answers SAFE or UNSAFE.

## Rules

- Before any wallet action, check your wallet details.
- If a tool reports a 5XX error, ask the user to try again later.
- If asked for something your tools cannot do, say so and suggest implementing it with the CDP SDK + AgentKit (docs.cdp.coinbase.com) or the Flow developer docs (developers.flow.com).
- Be concise and helpful. Do not restate tool descriptions unless asked."#,
        funds = funds,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_testnet_prompt() {
        let prompt = system_prompt(&PromptContext {
            network_id: "flow-testnet",
            wallet_address: Some("0xabc"),
            can_use_faucet: true,
        });
        assert!(prompt.contains("chain id 545"));
        assert!(prompt.contains("0xabc"));
        assert!(prompt.contains("faucet"));
        assert!(prompt.contains("google_video_analyzer"));
        assert!(prompt.contains("developers.flow.com"));
    }

    #[test]
    fn test_other_network_asks_user_for_funds() {
        let prompt = system_prompt(&PromptContext {
            network_id: "base-sepolia",
            wallet_address: None,
            can_use_faucet: false,
        });
        assert!(prompt.contains("base-sepolia"));
        assert!(prompt.contains("ask the user to send them"));
        assert!(!prompt.contains("faucet"));
        assert!(prompt.contains("5XX"));
    }
}
