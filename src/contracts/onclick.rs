use ethers::prelude::*;

// OnClick page registry and payment contract.
// getPage returns (owner, handle, role, walletAddress, goal, deadline, totalRaised, supporterCount, exists)
// getPayments returns (supporter, amount, timestamp, message, isFiatConverted)[]
abigen!(
    OnClick,
    r#"[
        {"type":"function","name":"createPage","inputs":[{"name":"handle","type":"string"},{"name":"role","type":"uint8"},{"name":"walletAddress","type":"address"},{"name":"goal","type":"uint256"},{"name":"deadline","type":"uint256"}],"outputs":[],"stateMutability":"nonpayable"},
        {"type":"function","name":"updatePage","inputs":[{"name":"handle","type":"string"},{"name":"walletAddress","type":"address"},{"name":"goal","type":"uint256"},{"name":"deadline","type":"uint256"}],"outputs":[],"stateMutability":"nonpayable"},
        {"type":"function","name":"makePayment","inputs":[{"name":"handle","type":"string"},{"name":"amount","type":"uint256"},{"name":"message","type":"string"}],"outputs":[],"stateMutability":"nonpayable"},
        {"type":"function","name":"getPage","inputs":[{"name":"handle","type":"string"}],"outputs":[{"name":"","type":"tuple","components":[{"name":"","type":"address"},{"name":"","type":"string"},{"name":"","type":"uint8"},{"name":"","type":"address"},{"name":"","type":"uint256"},{"name":"","type":"uint256"},{"name":"","type":"uint256"},{"name":"","type":"uint256"},{"name":"","type":"bool"}]}],"stateMutability":"view"},
        {"type":"function","name":"getPayments","inputs":[{"name":"handle","type":"string"}],"outputs":[{"name":"","type":"tuple[]","components":[{"name":"","type":"address"},{"name":"","type":"uint256"},{"name":"","type":"uint256"},{"name":"","type":"string"},{"name":"","type":"bool"}]}],"stateMutability":"view"},
        {"type":"function","name":"isHandleAvailable","inputs":[{"name":"handle","type":"string"}],"outputs":[{"name":"","type":"bool"}],"stateMutability":"view"},
        {"type":"function","name":"isGoalReached","inputs":[{"name":"handle","type":"string"}],"outputs":[{"name":"","type":"bool"}],"stateMutability":"view"}
    ]"#
);
