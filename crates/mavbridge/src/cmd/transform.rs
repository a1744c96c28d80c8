use mavbridge_ftf::{
    normalize_orientation, quaternion_from_rpy, quaternion_to_rpy, transform_covariance3,
    transform_covariance6, transform_frame_covariance3, transform_frame_covariance6,
    transform_frame_vector, transform_orientation, transform_vector, Covariance3, Covariance6,
    Quaternion, StaticTf, UnitQuaternion, Vector3,
};
use serde::Serialize;

use crate::cmd::{TransformArgs, TransformKind, TransformTarget, TransformValues};
use crate::exit::{ftf_error, CliError, CliResult, SUCCESS};
use crate::output::{print_value, OutputFormat};

#[derive(Debug, Clone, Copy)]
enum Target {
    Static(StaticTf),
    Arbitrary(Quaternion<f64>),
}

impl Target {
    fn from_args(target: &TransformTarget) -> CliResult<Self> {
        match (&target.direction, &target.quaternion) {
            (Some(direction), _) => Ok(Self::Static(*direction)),
            (None, Some(q)) => match q.as_slice() {
                &[w, x, y, z] => Ok(Self::Arbitrary(Quaternion::new(w, x, y, z))),
                _ => Err(CliError::usage("--quaternion needs exactly 4 values: w,x,y,z")),
            },
            (None, None) => Err(CliError::usage("one of --direction or --quaternion is required")),
        }
    }

    fn label(&self) -> String {
        match self {
            Self::Static(direction) => direction.to_string(),
            Self::Arbitrary(q) => format!("quaternion({},{},{},{})", q.w, q.i, q.j, q.k),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
struct TransformOutput {
    kind: &'static str,
    transform: String,
    input: Vec<f64>,
    output: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rpy: Option<[f64; 3]>,
}

pub fn run(args: TransformArgs, format: OutputFormat) -> CliResult<i32> {
    let output = compute(&args.kind)?;
    print_value(&output, format);
    Ok(SUCCESS)
}

fn compute(kind: &TransformKind) -> CliResult<TransformOutput> {
    match kind {
        TransformKind::Vector(values) => vector(values),
        TransformKind::Orientation(values) => orientation(values),
        TransformKind::Cov3(values) => covariance3(values),
        TransformKind::Cov6(values) => covariance6(values),
    }
}

fn vector(args: &TransformValues) -> CliResult<TransformOutput> {
    let &[x, y, z] = args.values.as_slice() else {
        return Err(CliError::usage("vector needs 3 values: x,y,z"));
    };
    let v = Vector3::new(x, y, z);
    let target = Target::from_args(&args.target)?;
    let out = match target {
        Target::Static(direction) => transform_vector(&v, direction),
        Target::Arbitrary(q) => {
            transform_frame_vector(&v, &q).map_err(|err| ftf_error("vector", err))?
        }
    };
    Ok(TransformOutput {
        kind: "vector",
        transform: target.label(),
        input: args.values.clone(),
        output: out.iter().copied().collect(),
        rpy: None,
    })
}

fn orientation(args: &TransformValues) -> CliResult<TransformOutput> {
    let Target::Static(direction) = Target::from_args(&args.target)? else {
        return Err(CliError::usage(
            "orientation conversions need --direction; --quaternion applies to vectors and covariances",
        ));
    };
    let q: UnitQuaternion<f64> = match args.values.as_slice() {
        &[roll, pitch, yaw] => quaternion_from_rpy(roll, pitch, yaw),
        &[w, x, y, z] => normalize_orientation(&Quaternion::new(w, x, y, z))
            .map_err(|err| ftf_error("orientation", err))?,
        _ => return Err(CliError::usage("orientation needs roll,pitch,yaw or w,x,y,z")),
    };

    let out = transform_orientation(&q, direction);
    let rpy = quaternion_to_rpy(&out);
    Ok(TransformOutput {
        kind: "orientation",
        transform: direction.to_string(),
        input: args.values.clone(),
        output: vec![out.w, out.i, out.j, out.k],
        rpy: Some([rpy.x, rpy.y, rpy.z]),
    })
}

fn covariance3(args: &TransformValues) -> CliResult<TransformOutput> {
    let values = args.values.as_slice();
    let (cov, row_major) = if let Ok(packed) = <[f64; 6]>::try_from(values) {
        (Covariance3::new(packed), false)
    } else if let Ok(full) = <&[f64; 9]>::try_from(values) {
        (Covariance3::from_row_major(full), true)
    } else {
        return Err(CliError::usage("cov3 needs 6 packed or 9 row-major values"));
    };

    let target = Target::from_args(&args.target)?;
    let out = match target {
        Target::Static(direction) => transform_covariance3(&cov, direction),
        Target::Arbitrary(q) => {
            transform_frame_covariance3(&cov, &q).map_err(|err| ftf_error("cov3", err))?
        }
    };
    Ok(TransformOutput {
        kind: "cov3",
        transform: target.label(),
        input: args.values.clone(),
        output: if row_major {
            out.to_row_major().to_vec()
        } else {
            out.packed().to_vec()
        },
        rpy: None,
    })
}

fn covariance6(args: &TransformValues) -> CliResult<TransformOutput> {
    let values = args.values.as_slice();
    let (cov, row_major) = if let Ok(packed) = <[f64; 21]>::try_from(values) {
        (Covariance6::new(packed), false)
    } else if let Ok(full) = <&[f64; 36]>::try_from(values) {
        (Covariance6::from_row_major(full), true)
    } else {
        return Err(CliError::usage("cov6 needs 21 packed or 36 row-major values"));
    };

    let target = Target::from_args(&args.target)?;
    let out = match target {
        Target::Static(direction) => transform_covariance6(&cov, direction),
        Target::Arbitrary(q) => {
            transform_frame_covariance6(&cov, &q).map_err(|err| ftf_error("cov6", err))?
        }
    };
    Ok(TransformOutput {
        kind: "cov6",
        transform: target.label(),
        input: args.values.clone(),
        output: if row_major {
            out.to_row_major().to_vec()
        } else {
            out.packed().to_vec()
        },
        rpy: None,
    })
}
