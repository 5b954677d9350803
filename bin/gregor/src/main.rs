use gregor::jvm::class_file::ClassFile;
use gregor::mutation::*;
use gregor::source::DirectorySource;
use gregor::*;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::fs;
use std::path::PathBuf;

fn main() -> Result<(), MutationError> {
    env_logger::init();

    let matches = cli().get_matches();
    match matches.subcommand() {
        Some(("list", matches)) => list(matches),
        Some(("apply", matches)) => apply(matches),
        _ => unreachable!("clap requires a subcommand"),
    }
}

fn cli() -> Command {
    let class_file = Arg::new("CLASS_FILE")
        .help("Compiled class to mutate")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .index(1);
    let classpath = Arg::new("classpath")
        .long("classpath")
        .value_name("DIR")
        .action(ArgAction::Append)
        .value_parser(value_parser!(PathBuf))
        .help("Directory of classes used to resolve superclasses (may be repeated)")
        .long_help(
            "Directory of classes used to resolve superclasses (may be repeated). \
             Recomputing frames needs every class the mutated method merges, including JDK \
             classes beyond a few core `java.lang` types, so one of these directories should \
             hold the JDK classes (eg. an extracted `java.base` module).",
        );

    Command::new("JVM bytecode mutator")
        .version(clap::crate_version!())
        .about("Find and apply small semantic mutations in compiled JVM classes")
        .subcommand_required(true)
        .subcommand(
            Command::new("list")
                .about("List every candidate mutation in a class")
                .arg(class_file.clone())
                .arg(
                    Arg::new("mutators")
                        .long("mutators")
                        .value_name("NAMES")
                        .value_delimiter(',')
                        .help("Rules or families to enable (eg. `DEFAULTS`, `ARITHMETIC`)"),
                )
                .arg(
                    Arg::new("method")
                        .long("method")
                        .value_name("NAME")
                        .help("Only consider methods with this name"),
                ),
        )
        .subcommand(
            Command::new("apply")
                .about("Write out the class with one mutation applied")
                .arg(class_file)
                .arg(
                    Arg::new("mutator")
                        .long("mutator")
                        .value_name("ID")
                        .required(true)
                        .help("Rule id (eg. `ARITHMETIC_REPLACE_SUB`)"),
                )
                .arg(
                    Arg::new("method")
                        .long("method")
                        .value_name("NAME")
                        .required(true),
                )
                .arg(
                    Arg::new("descriptor")
                        .long("descriptor")
                        .value_name("DESC")
                        .required(true)
                        .help("Method descriptor (eg. `(II)I`)"),
                )
                .arg(
                    Arg::new("ordinal")
                        .long("ordinal")
                        .value_name("N")
                        .default_value("0")
                        .value_parser(value_parser!(u32)),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .value_name("FILE")
                        .value_parser(value_parser!(PathBuf))
                        .help("Where to write the mutant (defaults to overwriting the input)"),
                )
                .arg(classpath),
        )
}

fn read_class(matches: &ArgMatches) -> Result<(PathBuf, Vec<u8>), MutationError> {
    let path = matches
        .get_one::<PathBuf>("CLASS_FILE")
        .cloned()
        .unwrap_or_default();
    log::info!("Reading '{}'", path.display());
    let bytes = fs::read(&path).map_err(jvm::Error::IoError)?;
    Ok((path, bytes))
}

fn list(matches: &ArgMatches) -> Result<(), MutationError> {
    let (_, bytes) = read_class(matches)?;

    let settings = match matches.get_many::<String>("mutators") {
        Some(names) => Settings::from_names(names)?,
        None => Settings::default(),
    };
    let filter = match matches.get_one::<String>("method") {
        Some(name) => MethodFilter::named(name.as_str()),
        None => MethodFilter::all(),
    };

    // Listing never recomputes frames, so no classpath is needed
    let mutater = Mutater::new(DirectorySource::new(vec![]), settings, filter);
    for record in mutater.enumerate(&bytes)? {
        println!("{}", record);
    }
    Ok(())
}

fn apply(matches: &ArgMatches) -> Result<(), MutationError> {
    let (input, bytes) = read_class(matches)?;
    let class = ClassFile::parse(&bytes)?;

    let mutator_name = matches
        .get_one::<String>("mutator")
        .cloned()
        .unwrap_or_default();
    let mutator = Mutator::from_id(&mutator_name)
        .ok_or_else(|| MutationError::UnknownMutator(mutator_name.clone()))?;
    let id = MutationIdentifier {
        location: MethodLocation {
            class: ClassInfo::from_class(&class)?.name,
            method: matches
                .get_one::<String>("method")
                .cloned()
                .unwrap_or_default(),
            descriptor: matches
                .get_one::<String>("descriptor")
                .cloned()
                .unwrap_or_default(),
        },
        mutator,
        ordinal: matches.get_one::<u32>("ordinal").copied().unwrap_or(0),
    };

    let roots: Vec<PathBuf> = matches
        .get_many::<PathBuf>("classpath")
        .map(|roots| roots.cloned().collect())
        .unwrap_or_default();
    let mutater = Mutater::new(
        DirectorySource::new(roots),
        Settings::new([mutator]),
        MethodFilter::all(),
    );
    let mutant = mutater.apply(&bytes, &id)?;
    println!("{}", mutant.record);

    let output = matches
        .get_one::<PathBuf>("output")
        .cloned()
        .unwrap_or(input);
    log::info!("Writing '{}'", output.display());
    fs::write(&output, &mutant.bytes).map_err(jvm::Error::IoError)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arguments() {
        cli().debug_assert();

        let matches = cli()
            .try_get_matches_from([
                "gregor", "apply", "Calc.class", "--mutator", "ARITHMETIC_REPLACE_SUB",
                "--method", "add", "--descriptor", "(II)I", "--classpath", "classes",
                "--classpath", "jdk/java.base",
            ])
            .unwrap();
        let (_, apply) = matches.subcommand().unwrap();
        assert_eq!(apply.get_one::<u32>("ordinal"), Some(&0));
        assert_eq!(apply.get_many::<PathBuf>("classpath").unwrap().count(), 2);
    }

    #[test]
    fn classpath_help_mentions_jdk_classes() {
        let mut command = cli();
        let apply = command.find_subcommand_mut("apply").unwrap();
        let help = apply.render_long_help().to_string();
        assert!(help.contains("java.base"), "{}", help);
    }
}
