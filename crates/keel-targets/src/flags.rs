//! Toolchain flag derivation.
//!
//! The Swift object and the objects the vendor tool compiles end up in one
//! link. Both compilers must agree on how floating-point values are passed,
//! and the linker will not notice if they do not. The triple handed to
//! `swiftc` and the codegen ABI are chosen separately: the triple only has to
//! name a runtime the compiler ships, while `-mfloat-abi`/`-mfpu` decide the
//! calling convention and are passed identically to both sides.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, warn};

use crate::descriptor::TargetDescriptor;

/// Always passed to both compilers; the vendor cores build with it.
pub const SHORT_ENUMS_FLAG: &str = "-fno-short-enums";

/// Board families with a known float ABI, recognised from the vendor core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TargetFamily {
    /// `*:renesas_uno` (Cortex-M4F, hard-float core libraries).
    RenesasUno,
    /// `*:mbed_giga` (dual-core M7/M4, softfp core libraries).
    MbedGiga,
    /// Anything else: catalog float settings are used verbatim, if present.
    Generic,
}

impl TargetFamily {
    /// Classify a vendor core identifier.
    pub fn from_core(core: &str) -> Self {
        let arch = core.rsplit(':').next().unwrap_or(core);
        match arch {
            "renesas_uno" => Self::RenesasUno,
            "mbed_giga" => Self::MbedGiga,
            _ => Self::Generic,
        }
    }
}

/// Float calling convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FloatAbi {
    Soft,
    SoftFp,
    Hard,
}

impl FloatAbi {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Soft => "soft",
            Self::SoftFp => "softfp",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for FloatAbi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FloatAbi {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "soft" => Ok(Self::Soft),
            "softfp" => Ok(Self::SoftFp),
            "hard" => Ok(Self::Hard),
            other => Err(format!("unknown float ABI `{other}`")),
        }
    }
}

/// Triples the Swift compiler ships an Embedded runtime for.
///
/// An unknown inventory assumes every triple is available, so no triple is
/// ever substituted on guesswork.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeInventory {
    known: Option<BTreeSet<String>>,
}

impl RuntimeInventory {
    /// Inventory that reports every triple as present.
    pub fn unknown() -> Self {
        Self { known: None }
    }

    /// Inventory containing exactly `triples`.
    pub fn from_triples<I, S>(triples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: Some(triples.into_iter().map(Into::into).collect()),
        }
    }

    pub fn has(&self, triple: &str) -> bool {
        match &self.known {
            Some(set) => set.contains(triple),
            None => true,
        }
    }
}

/// Compiler settings derived for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilerFlagSet {
    pub family: TargetFamily,
    pub triple: String,
    pub cpu: String,
    pub float_abi: Option<FloatAbi>,
    pub fpu: Option<String>,
}

impl CompilerFlagSet {
    /// Float ABI and FPU flags only.
    pub fn float_flags(&self) -> Vec<String> {
        let mut flags = Vec::new();
        if let Some(abi) = self.float_abi {
            flags.push(format!("-mfloat-abi={abi}"));
        }
        if let Some(fpu) = &self.fpu {
            flags.push(format!("-mfpu={fpu}"));
        }
        flags
    }

    /// Flags shared by both compilers, in emit order.
    pub fn extra_flags(&self) -> Vec<String> {
        let mut flags = vec![SHORT_ENUMS_FLAG.to_string()];
        flags.extend(self.float_flags());
        flags
    }

    /// Value of the `compiler.c.extra_flags`/`compiler.cpp.extra_flags` properties.
    pub fn extra_flags_string(&self) -> String {
        self.extra_flags().join(" ")
    }

    /// The shared flags forwarded to the Swift compiler's Clang importer.
    pub fn swiftc_xcc_args(&self) -> Vec<String> {
        self.extra_flags()
            .into_iter()
            .flat_map(|flag| ["-Xcc".to_string(), flag])
            .collect()
    }
}

/// Derive flags assuming every triple has a runtime.
pub fn derive(target: &TargetDescriptor) -> CompilerFlagSet {
    derive_with(target, &RuntimeInventory::unknown())
}

/// Derive flags, substituting a soft-float triple only when `inventory` lacks
/// the hard-float one and has the soft one.
pub fn derive_with(target: &TargetDescriptor, inventory: &RuntimeInventory) -> CompilerFlagSet {
    let family = TargetFamily::from_core(&target.core);
    let mut triple = target.triple.clone();
    let mut cpu = target.cpu.clone();

    let (float_abi, fpu) = match family {
        TargetFamily::RenesasUno if target.cpu == "cortex-m4" => {
            triple = soft_triple(&triple).unwrap_or(triple);
            (Some(FloatAbi::Hard), Some("fpv4-sp-d16".to_string()))
        }
        TargetFamily::MbedGiga => {
            if target.options.get("target_core") == Some("cm4") {
                cpu = "cortex-m4".to_string();
                (Some(FloatAbi::SoftFp), Some("fpv4-sp-d16".to_string()))
            } else {
                (Some(FloatAbi::SoftFp), Some("fpv5-d16".to_string()))
            }
        }
        _ => catalog_float(target),
    };

    if family != TargetFamily::RenesasUno || triple == target.triple {
        if let Some(soft) = soft_triple(&triple) {
            if !inventory.has(&triple) && inventory.has(&soft) {
                debug!(from = %triple, to = %soft, "no runtime for hard-float triple");
                triple = soft;
            }
        }
    }

    CompilerFlagSet {
        family,
        triple,
        cpu,
        float_abi,
        fpu,
    }
}

fn catalog_float(target: &TargetDescriptor) -> (Option<FloatAbi>, Option<String>) {
    let float_abi = target
        .float_abi
        .as_deref()
        .and_then(|raw| match raw.parse::<FloatAbi>() {
            Ok(abi) => Some(abi),
            Err(err) => {
                warn!(board = %target.name, "{err}; no float ABI flag emitted");
                None
            }
        });
    (float_abi, target.fpu.clone())
}

/// `…eabihf` → `…eabi`; `None` for triples that are not hard-float.
fn soft_triple(triple: &str) -> Option<String> {
    triple
        .strip_suffix("eabihf")
        .map(|stem| format!("{stem}eabi"))
}
