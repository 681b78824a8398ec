use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use crossbeam::channel;
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;

use crate::error::ConvertError;
use crate::geometry::{self, Candidate, SearchBounds};
use crate::palette;
use crate::planar;
use crate::png::IndexedEncoder;
use crate::score;

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub max_candidates: usize,
    pub raw_file_pattern: String,
    pub require_palette: bool,
    pub header_skip: usize,
    pub bounds: SearchBounds,
    pub workers: usize,
}

impl Default for ConvertOptions {
    fn default() -> ConvertOptions {
        ConvertOptions {
            max_candidates: 5,
            raw_file_pattern: String::from("*.raw"),
            require_palette: true,
            header_skip: 0,
            bounds: SearchBounds::default(),
            workers: 4,
        }
    }
}

/// One ranked candidate rendered to PNG bytes, ready to be written.
#[derive(Debug)]
pub struct Rendered {
    pub candidate: Candidate,
    pub png: Vec<u8>,
}

/// Convert raw file bytes into the top-ranked candidate images.
pub fn convert_buffer(raw: &[u8], opts: &ConvertOptions) -> Result<Vec<Rendered>> {
    if opts.header_skip > raw.len() {
        return Err(ConvertError::HeaderSkipTooLarge {
            skip: opts.header_skip,
            len: raw.len(),
        }
        .into());
    }

    let data = &raw[opts.header_skip..];
    let (planar, palette) = palette::resolve(
        data,
        opts.require_palette,
        opts.bounds.min_planes,
        opts.bounds.max_planes,
    )?;

    let candidates = geometry::enumerate(planar.len(), palette.len(), &opts.bounds);
    let scored = score_candidates(planar, candidates, opts.workers);
    let ranked = geometry::rank(scored, opts.max_candidates)?;

    let mut rendered = Vec::with_capacity(ranked.len());
    for candidate in ranked {
        let grid = planar::decode(planar, candidate.width, candidate.height, candidate.planes)?;
        let encoder = IndexedEncoder::new(grid.width as u32, grid.height as u32, &palette);
        rendered.push(Rendered {
            candidate,
            png: encoder.encode(&grid)?,
        });
    }

    Ok(rendered)
}

/// Score every candidate against the shared read-only planar slice. With
/// more than one worker, candidates are fanned out over scoped threads; all
/// results are collected before ranking so the final order stays
/// deterministic.
fn score_candidates(planar: &[u8], candidates: Vec<Candidate>, workers: usize) -> Vec<Candidate> {
    if workers <= 1 || candidates.len() < 2 {
        return candidates
            .into_iter()
            .map(|mut c| {
                c.score = score::stripe_score(planar, c.width, c.height, c.planes);
                c
            })
            .collect();
    }

    let (snd, rcv) = channel::bounded(1);
    let (scored_snd, scored_rcv) = channel::unbounded();

    crossbeam::scope(|s| {
        // feed candidates to the workers
        s.spawn(move |_| {
            for candidate in candidates {
                snd.send(candidate).unwrap();
            }

            drop(snd);
        });

        for _ in 0..workers {
            let rcv = rcv.clone();
            let scored_snd = scored_snd.clone();

            s.spawn(move |_| {
                for mut candidate in rcv.iter() {
                    candidate.score = score::stripe_score(
                        planar,
                        candidate.width,
                        candidate.height,
                        candidate.planes,
                    );
                    scored_snd.send(candidate).unwrap();
                }
            });
        }

        drop(scored_snd);
    })
    .unwrap();

    scored_rcv.iter().collect()
}

/// Convert a single raw file, writing one PNG per ranked candidate next to
/// `output` with a `_cand{NN}_{width}x{height}_p{planes}` suffix.
pub fn convert_file(input: &Path, output: &Path, opts: &ConvertOptions) -> Result<()> {
    let raw = fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;
    debug!("{}: {} bytes", input.display(), raw.len());

    let rendered = convert_buffer(&raw, opts)?;

    let dir = output.parent().map(Path::to_path_buf).unwrap_or_default();
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("out"));

    for (rank, item) in rendered.iter().enumerate() {
        let c = &item.candidate;
        let path = dir.join(format!(
            "{}_cand{:02}_{}x{}_p{}.png",
            stem,
            rank + 1,
            c.width,
            c.height,
            c.planes
        ));
        fs::write(&path, &item.png)
            .with_context(|| format!("failed to write {}", path.display()))?;

        println!(
            "OK {} -> {} ({}x{}, {} planes, score {:.2})",
            input.display(),
            path.display(),
            c.width,
            c.height,
            c.planes,
            c.score
        );
    }

    Ok(())
}

/// Convert a file or every matching file in a directory. Files are converted
/// independently; per-file failures are reported and counted but do not stop
/// the batch. Returns the number of failed files.
pub fn run(input: &Path, output: Option<&Path>, opts: &ConvertOptions) -> Result<usize> {
    let targets = collect_targets(input, output, opts)?;

    let bar = ProgressBar::new(targets.len() as u64);
    if targets.len() > 1 {
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{bar:50} {pos}/{len} [elapsed: {elapsed_precise}]"),
        );
    } else {
        bar.finish_and_clear();
    }

    let mut failures = 0;
    for (src, dst) in &targets {
        if let Err(err) = convert_file(src, dst, opts) {
            println!("FAIL {}: {:#}", src.display(), err);
            failures += 1;
        }

        if targets.len() > 1 {
            bar.inc(1);
        }
    }

    if targets.len() > 1 {
        bar.finish();
    }

    Ok(failures)
}

/// Resolve (input, output) file pairs: a file converts to `output` or to the
/// input path with a png extension; a directory converts every file matching
/// the raw-file pattern into `output` or an `out` subdirectory.
fn collect_targets(
    input: &Path,
    output: Option<&Path>,
    opts: &ConvertOptions,
) -> Result<Vec<(PathBuf, PathBuf)>> {
    if input.is_file() {
        let out = match output {
            Some(o) => o.to_path_buf(),
            None => input.with_extension("png"),
        };

        return Ok(vec![(input.to_path_buf(), out)]);
    }

    if input.is_dir() {
        let out_dir = match output {
            Some(o) => o.to_path_buf(),
            None => input.join("out"),
        };
        fs::create_dir_all(&out_dir)
            .with_context(|| format!("failed to create {}", out_dir.display()))?;

        let mut targets = Vec::new();
        for entry in fs::read_dir(input)
            .with_context(|| format!("failed to read directory {}", input.display()))?
        {
            let path = entry?.path();
            let name = match path.file_name() {
                Some(n) => n.to_string_lossy().into_owned(),
                None => continue,
            };

            if path.is_file() && matches_pattern(&name, &opts.raw_file_pattern) {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| name.clone());
                targets.push((path, out_dir.join(stem + ".png")));
            }
        }

        // read_dir order is platform-dependent
        targets.sort();

        return Ok(targets);
    }

    Err(ConvertError::InputNotFound(input.to_path_buf()).into())
}

/// Shell-style wildcard match: `*` matches any run of characters, `?` a
/// single character.
fn matches_pattern(name: &str, pattern: &str) -> bool {
    let name: Vec<char> = name.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    let (mut n, mut p) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while n < name.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == name[n]) {
            n += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, n));
            p += 1;
        } else if let Some((star_p, star_n)) = star {
            // backtrack: let the last * absorb one more character
            p = star_p + 1;
            n = star_n + 1;
            star = Some((star_p, star_n + 1));
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }

    p == pattern.len()
}
