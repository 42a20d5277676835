//! Contract bindings and deployment constants for Safe v1.4.1.

use alloy::primitives::{address, keccak256, Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

sol! {
    /// The deployed wallet contract, as far as this crate drives it.
    #[sol(rpc)]
    interface ISafe {
        function execTransaction(
            address to,
            uint256 value,
            bytes calldata data,
            uint8 operation,
            uint256 safeTxGas,
            uint256 baseGas,
            uint256 gasPrice,
            address gasToken,
            address payable refundReceiver,
            bytes memory signatures
        ) external payable returns (bool success);

        function nonce() external view returns (uint256);
        function getThreshold() external view returns (uint256);
        function getOwners() external view returns (address[] memory);
    }

    /// Factory deploying wallet proxies at CREATE2-deterministic addresses.
    #[sol(rpc)]
    interface ISafeProxyFactory {
        function createProxyWithNonce(
            address _singleton,
            bytes memory initializer,
            uint256 saltNonce
        ) external returns (address proxy);

        function proxyCreationCode() external pure returns (bytes memory);

        event ProxyCreation(address indexed proxy, address singleton);
    }

    /// Initializer run by the proxy on deployment.
    interface ISafeSetup {
        function setup(
            address[] calldata _owners,
            uint256 _threshold,
            address to,
            bytes calldata data,
            address fallbackHandler,
            address paymentToken,
            uint256 payment,
            address payable paymentReceiver
        ) external;
    }

    /// Demo ERC-20 with an open mint, the default proposal target.
    interface IMintableToken {
        function mint(address to, uint256 amount) external;
    }
}

/// Canonical Safe v1.4.1 deployment, identical on every supported chain
/// (the contracts themselves are CREATE2-deployed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeploymentAddresses {
    pub singleton: Address,
    pub proxy_factory: Address,
    pub fallback_handler: Address,
}

impl DeploymentAddresses {
    pub fn v1_4_1() -> Self {
        Self {
            singleton: address!("41675C099F32341bf84BFc5382aF534df5C7461a"),
            proxy_factory: address!("4e1DCf7AD4e460CfD30791CCC4F9c8a4f820ec67"),
            fallback_handler: address!("fd0732Dc9E303f09fCEf3a7388Ad10A83459Ec99"),
        }
    }
}

impl Default for DeploymentAddresses {
    fn default() -> Self {
        Self::v1_4_1()
    }
}

/// ABI-encodes the `setup` initializer for a fresh wallet: the given owners
/// and threshold, no delegate call, no payment.
pub fn encode_setup_call(owners: &[Address], threshold: u64, fallback_handler: Address) -> Bytes {
    let setup = ISafeSetup::setupCall {
        _owners: owners.to_vec(),
        _threshold: U256::from(threshold),
        to: Address::ZERO,
        data: Bytes::new(),
        fallbackHandler: fallback_handler,
        paymentToken: Address::ZERO,
        payment: U256::ZERO,
        paymentReceiver: Address::ZERO,
    };
    Bytes::from(setup.abi_encode())
}

/// The deterministic proxy address for a given initializer and salt nonce.
///
/// The factory derives the CREATE2 salt as
/// `keccak256(keccak256(initializer) || saltNonce)` and appends the padded
/// singleton address to the proxy creation code before hashing.
pub fn compute_proxy_address(
    factory: Address,
    singleton: Address,
    initializer: &Bytes,
    salt_nonce: U256,
    creation_code: &Bytes,
) -> Address {
    let initializer_hash = keccak256(initializer);

    let mut salt_input = [0u8; 64];
    salt_input[..32].copy_from_slice(initializer_hash.as_slice());
    salt_input[32..].copy_from_slice(&salt_nonce.to_be_bytes::<32>());
    let salt = keccak256(salt_input);

    let mut init_code = creation_code.to_vec();
    let mut singleton_word = [0u8; 32];
    singleton_word[12..].copy_from_slice(singleton.as_slice());
    init_code.extend_from_slice(&singleton_word);
    let init_code_hash = keccak256(&init_code);

    let mut preimage = Vec::with_capacity(1 + 20 + 32 + 32);
    preimage.push(0xff);
    preimage.extend_from_slice(factory.as_slice());
    preimage.extend_from_slice(salt.as_slice());
    preimage.extend_from_slice(init_code_hash.as_slice());

    Address::from_slice(&keccak256(&preimage)[12..])
}
