//! Universe file format: header pragmas, tables and append-only triggers.

/// `pragma application_id` of a universe file (`"GANN"`).
pub const APPLICATION_ID: i64 = 0x4741_4e4e;

/// `pragma user_version` of the current file format.
pub const FORMAT_VERSION: i64 = 1;

/// Tables, indices and triggers of a fresh universe.
///
/// `Variation`, `Trace` and `Generation` are append-only: updates and
/// deletes are rejected by triggers. `Experiment` rows stay mutable
/// (name, setup, lineage tip).
pub const SCHEMA: &str = r"
create table Experiment(
    id integer primary key,
    comment text,
    timestamp int not null,
    name text unique,
    last_variation_id int references Variation(id),
    last_activity_timestamp int not null,
    setup text not null);

create table Variation(
    id integer primary key,
    comment text,
    timestamp int not null,
    previous_id int references Variation(id),
    experiment_id int not null references Experiment(id),
    name text,
    config text not null);

create table Trace(
    id integer primary key,
    comment text,
    timestamp int not null,
    variation_id int not null references Variation(id),
    evolution_config text not null);

create table Generation(
    id integer primary key,
    timestamp int not null,
    trace_id int not null references Trace(id),
    generation int not null,
    summary text not null,
    details text not null,
    genotypes text not null,
    profile text not null,
    unique(trace_id, generation));

create index variation_previous on Variation(previous_id);
create index variation_experiment on Variation(experiment_id);
create index trace_variation on Trace(variation_id);

create trigger variation_no_update before update on Variation
begin select raise(fail, 'Variation is append-only'); end;
create trigger variation_no_delete before delete on Variation
begin select raise(fail, 'Variation is append-only'); end;
create trigger trace_no_update before update on Trace
begin select raise(fail, 'Trace is append-only'); end;
create trigger trace_no_delete before delete on Trace
begin select raise(fail, 'Trace is append-only'); end;
create trigger generation_no_update before update on Generation
begin select raise(fail, 'Generation is append-only'); end;
create trigger generation_no_delete before delete on Generation
begin select raise(fail, 'Generation is append-only'); end;
";
