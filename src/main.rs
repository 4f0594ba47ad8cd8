use clap::{App, Arg, ArgMatches};
use icofix::{
    FrameEncoding, IconSize, ResampleFilter, ResizeConfig, DEFAULT_INPUT_PATH,
    DEFAULT_OUTPUT_PATH,
};
use std::process;

//===========================================================================//

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn"),
    )
    .init();
    let matches = App::new("icofix")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Resamples an icon into a multi-resolution ICO file")
        .arg(
            Arg::with_name("input")
                .takes_value(true)
                .value_name("PATH")
                .short("i")
                .long("input")
                .default_value(DEFAULT_INPUT_PATH)
                .help("Sets the icon (or PNG/BMP image) to read"),
        )
        .arg(
            Arg::with_name("output")
                .takes_value(true)
                .value_name("PATH")
                .short("o")
                .long("output")
                .default_value(DEFAULT_OUTPUT_PATH)
                .help("Sets the icon file to write"),
        )
        .arg(
            Arg::with_name("size")
                .takes_value(true)
                .value_name("WxH")
                .short("s")
                .long("size")
                .multiple(true)
                .number_of_values(1)
                .validator(|value| value.parse::<IconSize>().map(|_| ()))
                .help("Adds a frame size, replacing the default list"),
        )
        .arg(
            Arg::with_name("filter")
                .takes_value(true)
                .value_name("NAME")
                .long("filter")
                .possible_values(&[
                    "nearest",
                    "triangle",
                    "catmullrom",
                    "gaussian",
                    "lanczos3",
                ])
                .help("Sets the resampling filter [default: lanczos3]"),
        )
        .arg(
            Arg::with_name("encoding")
                .takes_value(true)
                .value_name("FORMAT")
                .long("encoding")
                .possible_values(&["png", "bmp", "auto"])
                .help("Sets how frames are stored [default: png]"),
        )
        .get_matches();
    let config = match config_from_matches(&matches) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("error: {}", message);
            process::exit(2);
        }
    };
    if let Err(error) = icofix::resize_icon(&config) {
        eprintln!("error: {}", error);
        process::exit(1);
    }
    println!("{}", icofix::confirmation_message(&config));
}

fn config_from_matches(matches: &ArgMatches) -> Result<ResizeConfig, String> {
    let mut config = ResizeConfig::default();
    if let Some(path) = matches.value_of("input") {
        config = config.with_input_path(path);
    }
    if let Some(path) = matches.value_of("output") {
        config = config.with_output_path(path);
    }
    if let Some(values) = matches.values_of("size") {
        let sizes = values
            .map(|value| value.parse::<IconSize>())
            .collect::<Result<Vec<_>, _>>()?;
        config = config.with_sizes(sizes);
    }
    if let Some(name) = matches.value_of("filter") {
        config = config.with_filter(name.parse::<ResampleFilter>()?);
    }
    if let Some(name) = matches.value_of("encoding") {
        config = config.with_encoding(name.parse::<FrameEncoding>()?);
    }
    Ok(config)
}

//===========================================================================//
