//! Builtin property schemas.
//!
//! One constructor per registered kind, plus the two experiment-level
//! sets (`evolution` and `core`). Names, defaults and descriptions are
//! part of the persisted variation format: renaming a property changes
//! every snapshot that contains it.

use darwin_props::{PropertyError, PropertyKind, PropertySchema};
use darwin_types::{FitnessInfoKind, ProfileInfoKind};

/// Tags of the `tournament_type` variant.
pub const TOURNAMENT_TYPES: [&str; 2] = ["simple", "swiss"];

/// Activation functions understood by the network populations.
const ACTIVATION_FUNCTIONS: &[&str] = &["logistic", "tanh", "relu"];

// ---------------------------------------------------------------------------
// Experiment-level sets
// ---------------------------------------------------------------------------

/// Evolution settings of an experiment.
pub fn evolution() -> Result<PropertySchema, PropertyError> {
    PropertySchema::builder("evolution")
        .int("max_generations", 1_000_000, "Maximum number of generations")
        .bool(
            "save_champion_genotype",
            true,
            "Save the champion genotype in every generation",
        )
        .enumeration(
            "fitness_information",
            FitnessInfoKind::TAGS,
            FitnessInfoKind::FullCompressed.as_str(),
            "How much of the fitness distribution is recorded",
        )
        .bool("save_genealogy", false, "Record the genealogy of every genotype")
        .enumeration(
            "profile_information",
            ProfileInfoKind::TAGS,
            ProfileInfoKind::GenerationOnly.as_str(),
            "Granularity of the recorded timing information",
        )
        .build()
}

/// Network weight settings shared by every population.
pub fn core() -> Result<PropertySchema, PropertyError> {
    PropertySchema::builder("core")
        .bool(
            "mutation_normal_distribution",
            true,
            "Use a normal distribution for weight mutations",
        )
        .float("mutation_std_dev", 1.0, "Standard deviation of weight mutations")
        .float("connection_range", 64.0, "Connection weights range")
        .float("connection_resolution", 0.01, "Connection weights resolution")
        .bool("sparse_weights", false, "Use sparse weight initialization")
        .float("weights_density", 0.25, "Density of non-zero initial weights")
        .build()
}

// ---------------------------------------------------------------------------
// Populations
// ---------------------------------------------------------------------------

/// The `dummy` population: random or constant outputs, no learning.
pub fn dummy_population() -> Result<PropertySchema, PropertyError> {
    PropertySchema::builder("dummy")
        .float("input_range", 10.0, "The expected inputs range")
        .float("output_range", 10.0, "The range of (random) output values")
        .bool("random_outputs", true, "Generate random outputs")
        .float("const_output", 0.0, "Used for all outputs if random_outputs is false")
        .build()
}

/// The `neat` population.
pub fn neat_population() -> Result<PropertySchema, PropertyError> {
    PropertySchema::builder("neat")
        .enumeration(
            "activation_function",
            ACTIVATION_FUNCTIONS,
            "logistic",
            "Main activation function",
        )
        .bool("implicit_bias_links", true, "Use bias nodes feeding into all non-input nodes")
        .bool("use_lstm_nodes", false, "Use LSTM nodes instead of basic nodes")
        .float("elite_percentage", 0.1, "Elite percentage")
        .float("elite_min_fitness", 0.0, "Elite min fitness")
        .int("larva_age", 5, "Genotypes under larva age are protected from replacement")
        .int("old_age", 25, "Age limit until genotypes are protected from replacement")
        .float("c1", 1.0, "Genotype compatibility C1 coefficient")
        .float("c2", 0.7, "Genotype compatibility C2 coefficient")
        .float("c3", 0.1, "Genotype compatibility C3 coefficient")
        .float("compatibility_threshold", 5.0, "Species distance threshold")
        .int("min_species_size", 20, "Species with fewer members go extinct")
        .float("weight_mutation_chance", 0.01, "Weight mutation chance")
        .float("new_link_chance", 0.02, "New link chance")
        .float("new_node_chance", 0.001, "New node chance")
        .bool("normalize_input", false, "Normalize input values")
        .bool("normalize_output", false, "Normalize output values")
        .build()
}

/// The `cne.lstm` population (conventional neuroevolution, LSTM layers).
pub fn cne_lstm_population() -> Result<PropertySchema, PropertyError> {
    PropertySchema::builder("cne.lstm")
        .enumeration(
            "activation_function",
            ACTIVATION_FUNCTIONS,
            "tanh",
            "Main activation function",
        )
        .list(
            "hidden_layers",
            PropertyKind::Int,
            "{ }",
            "Hidden layer sizes",
        )
        .float("elite_percentage", 0.1, "Elite percentage")
        .float("mutation_chance", 0.1, "Weight mutation chance")
        .bool("normalize_input", false, "Normalize input values")
        .build()
}

// ---------------------------------------------------------------------------
// Domains
// ---------------------------------------------------------------------------

/// The `unicycle` balancing domain.
pub fn unicycle_domain() -> Result<PropertySchema, PropertyError> {
    PropertySchema::builder("unicycle")
        .float("gravity", 9.8, "Gravitational acceleration")
        .float("max_distance", 3.0, "Maximum distance from the center")
        .float("max_angle", 60.0, "Maximum angle from vertical")
        .float("max_initial_angle", 10.0, "Maximum starting angle from vertical")
        .float("pole_length", 1.5, "Pole length")
        .float("wheel_radius", 0.2, "Wheel size (radius)")
        .float("max_torque", 5.0, "Maximum torque which can be applied to the wheel")
        .bool("input_pole_angle", true, "Use the pole angle as input")
        .bool("input_angular_velocity", false, "Use the angular velocity as input")
        .bool("input_wheel_distance", true, "Use the wheel distance as input")
        .bool("input_wheel_velocity", false, "Use the wheel linear velocity as input")
        .int("test_worlds", 5, "Number of test worlds per generation")
        .int("max_steps", 1000, "Maximum number of steps per episode")
        .build()
}

/// The `conquest` board game domain.
pub fn conquest_domain() -> Result<PropertySchema, PropertyError> {
    PropertySchema::builder("conquest")
        .int("calibration_matches", 100, "Number of calibration matches")
        .enumeration(
            "board",
            &["triangle", "diamond", "simple diamond", "hexagon", "simple hexagon"],
            "hexagon",
            "Board layout",
        )
        .int("max_steps", 2500, "If no one wins before max_steps, the game is a tie")
        .float("points_win", 1.0, "Points for a win")
        .float("points_lose", 0.0, "Points for a lost game")
        .float("points_draw", 0.4, "Points for a draw")
        .float("int_unit_scale", 10.0, "A scaling factor to display units as integers")
        .variant("tournament_type", tournament_cases()?, "swiss", "Tournament type")
        .build()
}

/// The `tic_tac_toe` domain.
pub fn tic_tac_toe_domain() -> Result<PropertySchema, PropertyError> {
    PropertySchema::builder("tic_tac_toe")
        .enumeration("ann_type", &["value", "policy"], "value", "The role of the evolved brains")
        .int("calibration_matches", 100, "Number of calibration games")
        .variant("tournament_type", tournament_cases()?, "swiss", "Tournament type")
        .build()
}

fn tournament_cases() -> Result<Vec<(&'static str, PropertySchema)>, PropertyError> {
    let simple = PropertySchema::builder("simple_tournament")
        .int("eval_games", 10, "Number of evaluation games")
        .bool("rematches", true, "Play both-side rematches?")
        .build()?;
    let swiss = PropertySchema::builder("swiss_tournament")
        .int("rounds", 20, "Number of tournament rounds")
        .bool("rematches", true, "Play both-side rematches?")
        .build()?;
    Ok(vec![("simple", simple), ("swiss", swiss)])
}
