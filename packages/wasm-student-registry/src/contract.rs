//! Student registry contract interface
//!
//! Calldata encoding, return decoding and revert decoding for the
//! registry contract. The binary layout is owned by the contract; this
//! module only mirrors its functions and custom errors.

use crate::error::RegistryError;
use crate::provider::RpcError;
use crate::types::Record;
use alloy_primitives::U256;
use alloy_sol_types::{sol, Panic, Revert, SolCall, SolError, SolInterface};
use std::fmt;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IStudentRegistry {
        error StudentAlreadyExists(uint256 id);
        error StudentNotFound(uint256 id);
        error NotOwner(address caller);
        error InvalidRange(uint256 start, uint256 end);
        error InvalidGrade(uint256 grade);
        error CourseNotCompleted(uint256 courseId);

        function addStudent(uint256 id, string name, uint256 birthYear, string classLabel) external;
        function updateStudentName(uint256 id, string newName) external;
        function deleteStudent(uint256 id) external;

        function getStudentByMSSV(uint256 id) external view returns (uint256 id, string name, uint256 birthYear, string classLabel, bool exists);
        function getStudentsInRange(uint256 start, uint256 end) external view returns (uint256[] ids);
        function getTotalStudents() external view returns (uint256 total);
        function getCompletedCourses(uint256 id) external view returns (uint256[] courses);
    }
}

pub use IStudentRegistry::{
    addStudentCall, deleteStudentCall, getCompletedCoursesCall, getStudentByMSSVCall,
    getStudentByMSSVReturn, getStudentsInRangeCall, getTotalStudentsCall, updateStudentNameCall,
    IStudentRegistryCalls, IStudentRegistryErrors,
};

/// Decoded reason of a reverted call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertReason {
    /// `StudentAlreadyExists(id)`
    StudentAlreadyExists(U256),
    /// `StudentNotFound(id)`
    StudentNotFound(U256),
    /// `NotOwner(caller)`, caller in lowercase hex
    NotOwner(String),
    /// `InvalidRange(start, end)`
    InvalidRange { start: U256, end: U256 },
    /// `InvalidGrade(grade)`
    InvalidGrade(U256),
    /// `CourseNotCompleted(courseId)`
    CourseNotCompleted(U256),
    /// `Error(string)` or a reason string reported by the node
    Message(String),
    /// `Panic(uint256)`
    Panic(U256),
    /// Undecodable revert data (hex)
    Unknown(String),
}

impl RevertReason {
    /// Reasons that name a registry condition and get a dedicated message
    pub fn is_domain_specific(&self) -> bool {
        matches!(
            self,
            RevertReason::StudentAlreadyExists(_)
                | RevertReason::StudentNotFound(_)
                | RevertReason::NotOwner(_)
        )
    }

    /// Extract a revert reason from a JSON-RPC error, if it describes one
    pub fn from_rpc_error(err: &RpcError) -> Option<RevertReason> {
        if let Some(data) = err.revert_data() {
            return Some(decode_revert(&data));
        }
        let lowered = err.message.to_lowercase();
        if err.code == RpcError::EXECUTION_REVERTED || lowered.contains("revert") {
            let reason = err
                .message
                .trim()
                .trim_start_matches("execution reverted")
                .trim_start_matches(':')
                .trim();
            return Some(if reason.is_empty() {
                RevertReason::Unknown("0x".to_string())
            } else {
                RevertReason::Message(reason.to_string())
            });
        }
        None
    }
}

impl fmt::Display for RevertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevertReason::StudentAlreadyExists(id) => write!(f, "StudentAlreadyExists({})", id),
            RevertReason::StudentNotFound(id) => write!(f, "StudentNotFound({})", id),
            RevertReason::NotOwner(caller) => write!(f, "NotOwner({})", caller),
            RevertReason::InvalidRange { start, end } => {
                write!(f, "InvalidRange({}, {})", start, end)
            }
            RevertReason::InvalidGrade(grade) => write!(f, "InvalidGrade({})", grade),
            RevertReason::CourseNotCompleted(course) => write!(f, "CourseNotCompleted({})", course),
            RevertReason::Message(reason) => write!(f, "{}", reason),
            RevertReason::Panic(code) => write!(f, "Panic(0x{:x})", code),
            RevertReason::Unknown(data) if data == "0x" => write!(f, "execution reverted"),
            RevertReason::Unknown(data) => write!(f, "execution reverted: {}", data),
        }
    }
}

/// Decode raw revert data (selector + ABI-encoded arguments)
pub fn decode_revert(data: &[u8]) -> RevertReason {
    if data.len() < 4 {
        return RevertReason::Unknown(format!("0x{}", hex::encode(data)));
    }

    if let Ok(err) = IStudentRegistryErrors::abi_decode(data, true) {
        return match err {
            IStudentRegistryErrors::StudentAlreadyExists(e) => {
                RevertReason::StudentAlreadyExists(e.id)
            }
            IStudentRegistryErrors::StudentNotFound(e) => RevertReason::StudentNotFound(e.id),
            IStudentRegistryErrors::NotOwner(e) => {
                RevertReason::NotOwner(format!("0x{}", hex::encode(e.caller.as_slice())))
            }
            IStudentRegistryErrors::InvalidRange(e) => RevertReason::InvalidRange {
                start: e.start,
                end: e.end,
            },
            IStudentRegistryErrors::InvalidGrade(e) => RevertReason::InvalidGrade(e.grade),
            IStudentRegistryErrors::CourseNotCompleted(e) => {
                RevertReason::CourseNotCompleted(e.courseId)
            }
        };
    }

    let selector = &data[..4];
    if selector == Revert::SELECTOR.as_slice() {
        if let Ok(revert) = Revert::abi_decode(data, true) {
            return RevertReason::Message(revert.reason);
        }
    }
    if selector == Panic::SELECTOR.as_slice() {
        if let Ok(panic) = Panic::abi_decode(data, true) {
            return RevertReason::Panic(panic.code);
        }
    }

    RevertReason::Unknown(format!("0x{}", hex::encode(data)))
}

/// An encoded contract call: function name plus calldata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    signature: &'static str,
    data: Vec<u8>,
}

impl ContractCall {
    /// Encode a typed call
    pub fn new<C: SolCall>(call: &C) -> Self {
        Self {
            signature: C::SIGNATURE,
            data: call.abi_encode(),
        }
    }

    /// Full signature, e.g. `deleteStudent(uint256)`
    pub fn signature(&self) -> &'static str {
        self.signature
    }

    /// Function name, e.g. `deleteStudent`
    pub fn function_name(&self) -> &'static str {
        self.signature
            .split_once('(')
            .map(|(name, _)| name)
            .unwrap_or(self.signature)
    }

    /// Raw calldata
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Calldata as a `0x`-prefixed hex string
    pub fn data_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.data))
    }
}

/// `addStudent(id, name, birthYear, classLabel)`
pub fn add_student(id: u64, name: &str, birth_year: u64, class_label: &str) -> ContractCall {
    ContractCall::new(&addStudentCall {
        id: U256::from(id),
        name: name.to_string(),
        birthYear: U256::from(birth_year),
        classLabel: class_label.to_string(),
    })
}

/// `updateStudentName(id, newName)`
pub fn update_student_name(id: u64, new_name: &str) -> ContractCall {
    ContractCall::new(&updateStudentNameCall {
        id: U256::from(id),
        newName: new_name.to_string(),
    })
}

/// `deleteStudent(id)`
pub fn delete_student(id: u64) -> ContractCall {
    ContractCall::new(&deleteStudentCall { id: U256::from(id) })
}

/// Narrow a contract integer to u64
pub fn u256_to_u64(value: U256, field: &str) -> Result<u64, RegistryError> {
    u64::try_from(value)
        .map_err(|_| RegistryError::Decode(format!("{} out of range: {}", field, value)))
}

/// Convert a `getStudentByMSSV` result into a record
pub fn record_from_return(ret: getStudentByMSSVReturn) -> Result<Record, RegistryError> {
    Ok(Record {
        id: u256_to_u64(ret.id, "id")?,
        name: ret.name,
        birth_year: u256_to_u64(ret.birthYear, "birthYear")?,
        class_label: ret.classLabel,
        exists: ret.exists,
        completed_courses: None,
    })
}
