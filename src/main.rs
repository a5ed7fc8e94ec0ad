// SPDX: CC0-1.0

use anyhow::Context;
use chrono::{DateTime, Local};
use core::num::NonZeroU16;
use gradient_field::{
    latex::{self, Latex},
    plot::{self, Language, Script, Style},
    shell::{self, Command},
    Function, Number, Point, Window,
};
use log::{debug, info};
#[cfg(not(debug_assertions))]
use std::process::Stdio;
use std::{
    fs::OpenOptions,
    io::{stdout, BufWriter, Write},
    process::{self, Child, ExitCode},
    sync::Arc,
};

const DEFAULT_EXPR: &str = "x**2 + y**2";

fn output_filename(now: DateTime<Local>, ext: &str) -> String {
    format!(
        "{}_output-{}.{}",
        env!("CARGO_PKG_NAME"),
        now.format("%Y-%m-%d_%H-%M-%S"),
        ext
    )
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("unexpected error: {err}");
            let chain = err.chain();
            if chain.len() > 1 {
                eprintln!();
                eprintln!("context:");
                for it in chain.skip(1) {
                    eprintln!("  {it}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug)]
struct State {
    expr: Option<Arc<String>>,
    fun: Option<Function>,
    point: Point<Number>,
    win: Window,
    style: Style,
    gnuplot: Option<Child>,
}

fn try_main() -> anyhow::Result<()> {
    let mut state = State {
        expr: Some(Arc::new(String::from(DEFAULT_EXPR))),
        fun: None,
        point: Point { x: 1.0, y: 1.0 },
        win: Window::default(),
        style: Style::default(),
        gnuplot: None,
    };

    let mut stdout = BufWriter::new(stdout());
    compile_expr(&mut stdout, &mut state)?;
    loop {
        if let Some(ref expr) = state.expr {
            writeln!(stdout, "f(x, y) = {expr}")?;
        } else {
            writeln!(stdout, "f(x, y) is not set")?;
        }
        writeln!(stdout, "at ({}, {})", state.point.x, state.point.y)?;

        let mut try_cmd = shell::input(&mut stdout, "> ")?;
        try_cmd.make_ascii_lowercase();
        writeln!(stdout)?;

        if let Ok(cmd) = try_cmd.parse::<Command>() {
            debug!("command: {}", cmd.name());
            match cmd {
                Command::Help => {
                    for c in Command::exhaustive() {
                        writeln!(stdout, "{name}: {help}", name = c.name(), help = c.help())?;
                    }
                }

                Command::Quit => break,

                Command::SetExpr => set_expr(&mut stdout, &mut state)?,

                Command::SetPoint => set_point(&mut stdout, &mut state)?,

                Command::SetWin => set_win(&mut stdout, &mut state)?,

                Command::SetStyle => set_style(&mut stdout, &mut state)?,

                Command::Grad => print_grad(&mut stdout, &state)?,

                Command::Latex => print_latex(&mut stdout, &state)?,

                Command::PrintProg => {
                    if let Some(ref fun) = state.fun {
                        for (name, prog) in fun.programs() {
                            shell::dump_program(&mut stdout, prog, format_args!("{name}"))?;
                        }
                    } else {
                        shell::expr_undefined(&mut stdout)?;
                    }
                }

                Command::Plot => plot_expr(&mut stdout, &mut state)?,
            }
        } else {
            writeln!(stdout, r#"Unknown command, try "help" for help"#)?;
        }

        writeln!(stdout)?;
    }
    stdout.flush()?;
    Ok(())
}

fn read_number<W: Write>(mut out: W, name: &str, dst: &mut Number) -> anyhow::Result<bool> {
    match shell::read_fromstr::<_, Number>(
        &mut out,
        format_args!("?{name} (is {cur}) = ", cur = *dst),
        true,
    )? {
        Ok(Some(new)) if new.is_finite() => *dst = new,
        Ok(Some(_)) => {
            writeln!(out, "error: {name} must be a finite number")?;
            return Ok(false);
        }
        Ok(None) => {}
        Err(_) => return Ok(false),
    }
    Ok(true)
}

fn set_point<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    writeln!(out, "note: leave blank to skip")?;
    for (name, dst) in [("x", &mut state.point.x), ("y", &mut state.point.y)] {
        if !read_number(&mut out, name, dst)? {
            return Ok(());
        }
    }
    Ok(())
}

fn set_win<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    writeln!(out, "win = {:#}", state.win)?;
    writeln!(out)?;
    writeln!(out, "note: leave blank to skip")?;

    let mut win = state.win.clone();
    for (name, dst) in [
        ("x min", &mut win.x.start),
        ("x max", &mut win.x.end),
        ("y min", &mut win.y.start),
        ("y max", &mut win.y.end),
    ] {
        if !read_number(&mut out, name, dst)? {
            return Ok(());
        }
    }

    writeln!(
        out,
        "note: resolution must be a nonzero integer no larger than {}",
        gradient_field::MAX_RESOLUTION
    )?;
    for (name, dst) in [("resolution", &mut win.resolution)] {
        match shell::read_fromstr::<_, NonZeroU16>(
            &mut out,
            format_args!("?{name} (is {cur}) = ", cur = *dst),
            true,
        )? {
            Ok(Some(new)) => *dst = new,
            Ok(None) => {}
            Err(_) => return Ok(()),
        }
    }

    match win.validate() {
        Ok(()) => state.win = win,
        Err(err) => writeln!(out, "error: {err}")?,
    }
    Ok(())
}

fn set_style<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    writeln!(out, "style = {:#}", state.style)?;
    writeln!(out)?;
    writeln!(out, "note: leave blank to skip")?;
    writeln!(
        out,
        "note: the arrow scale only changes how long the arrow is drawn"
    )?;
    if !read_number(&mut out, "arrow scale", &mut state.style.arrow_scale)? {
        return Ok(());
    }

    match shell::read_fromstr::<_, bool>(
        &mut out,
        format_args!(
            "?arrow head (is {cur}, true/false) = ",
            cur = state.style.arrow_head
        ),
        true,
    )? {
        Ok(Some(new)) => state.style.arrow_head = new,
        Ok(None) => {}
        Err(_) => return Ok(()),
    }

    match shell::read_fromstr::<_, Language>(
        &mut out,
        format_args!("?language (is {cur}, en/ms) = ", cur = state.style.language),
        true,
    )? {
        Ok(Some(new)) => state.style.language = new,
        Ok(None) | Err(_) => {}
    }
    Ok(())
}

fn print_grad<W: Write>(mut out: W, state: &State) -> anyhow::Result<()> {
    let Some(ref fun) = state.fun else {
        shell::expr_undefined(&mut out)?;
        return Ok(());
    };
    let p = state.point;

    writeln!(out, "df/dx = {}", fun.dx)?;
    writeln!(out, "df/dy = {}", fun.dy)?;
    match fun.gradient_at(p) {
        Ok(grad) => {
            writeln!(out, "f({}, {}) = {}", p.x, p.y, grad.value)?;
            writeln!(
                out,
                "grad f({}, {}) = <{:.2}, {:.2}>",
                p.x, p.y, grad.gradient.x, grad.gradient.y
            )?;
            writeln!(
                out,
                "  (full precision: <{}, {}>, magnitude {})",
                grad.gradient.x,
                grad.gradient.y,
                grad.magnitude()
            )?;
        }
        Err(err) => shell::report_eval_err(&mut out, "f or its gradient", &err)?,
    }
    Ok(())
}

fn print_latex<W: Write>(mut out: W, state: &State) -> anyhow::Result<()> {
    let Some(ref fun) = state.fun else {
        shell::expr_undefined(&mut out)?;
        return Ok(());
    };
    writeln!(out, "f(x, y) = {}", Latex(&fun.expr))?;
    match fun.gradient_at(state.point) {
        Ok(grad) => writeln!(out, "{}", latex::gradient_line(state.point, &grad, 2))?,
        Err(err) => shell::report_eval_err(&mut out, "f or its gradient", &err)?,
    }
    Ok(())
}

fn plot_expr<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let (expr, fun) = if let Some(ref expr) = state.expr {
        if let Some(ref fun) = state.fun {
            (expr, fun)
        } else {
            shell::expr_undefined(&mut out)?;
            return Ok(());
        }
    } else {
        shell::expr_undefined(&mut out)?;
        return Ok(());
    };

    // no partial success: without a gradient there is nothing to draw
    let grad = match fun.gradient_at(state.point) {
        Ok(grad) => grad,
        Err(err) => {
            shell::report_eval_err(&mut out, "f or its gradient", &err)?;
            return Ok(());
        }
    };
    let sample = match fun.sample_surface(&state.win) {
        Ok(sample) => sample,
        Err(err) => {
            writeln!(out, "error: {err}")?;
            return Ok(());
        }
    };
    writeln!(out, "evaluation ok")?;
    let undefined = sample.undefined();
    if undefined > 0 {
        writeln!(
            out,
            "note: f is undefined at {undefined} grid points, they are left out of the surface"
        )?;
    }

    // set up gnuplot
    if let Some(mut old_child) = state.gnuplot.take() {
        stop_gnuplot(&mut old_child)?;
    }
    let now = Local::now();
    let data_path = output_filename(now, "data");
    let gnuplot_path = output_filename(now, "gnuplot");
    let svg_path = output_filename(now, "svg");

    let mut data = BufWriter::new(
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&data_path)
            .context("failed to open output data file")?,
    );
    plot::write_data(&mut data, &sample).context("failed to write to output data file")?;
    data.flush()?;
    data.get_mut().sync_data()?;
    drop(data);
    info!("wrote {data_path}");

    let mut gnuplot = BufWriter::new(
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&gnuplot_path)
            .context("failed to open output gnuplot file")?,
    );
    Script {
        data_path: &data_path,
        svg_path: &svg_path,
        expr,
        window: &state.win,
        point: state.point,
        grad: &grad,
        style: &state.style,
    }
    .write(&mut gnuplot)
    .context("failed to write to output gnuplot file")?;

    // done with the file
    gnuplot.flush()?;
    gnuplot.get_mut().sync_data()?;
    drop(gnuplot);
    info!("wrote {gnuplot_path}");

    // spawn gnuplot and provide the path to the file
    let mut cmd = process::Command::new("gnuplot");
    cmd.arg("--persist").arg(&gnuplot_path);
    #[cfg(not(debug_assertions))]
    {
        cmd.stdout(Stdio::null())
            .stderr(Stdio::null())
            .stdin(Stdio::null());
    }
    let child = cmd
        .spawn()
        .context("failed to spawn gnuplot (is it installed and in ${{PATH}}?)")?;
    info!("spawned gnuplot (pid {})", child.id());

    state.gnuplot = Some(child);
    Ok(())
}

fn stop_gnuplot(child: &mut Child) -> anyhow::Result<()> {
    child
        .kill()
        .context("failed to kill previous gnuplot child")?;
    // reap it so it doesn't linger as a zombie
    let status = child
        .wait()
        .context("failed to wait for previous gnuplot child")?;
    debug!("previous gnuplot exited with {status}");
    Ok(())
}

fn set_expr<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    // read input expression
    let input = shell::input(&mut out, "f(x, y) = ")?;
    if input.is_empty() {
        return Ok(());
    }

    state.fun = None;
    state.expr = Some(Arc::new(input));

    // lex, parse & differentiate input
    compile_expr(&mut out, state)?;

    Ok(())
}

fn compile_expr<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let Some(ref input) = state.expr else {
        return Ok(());
    };

    match Function::new(Arc::clone(input)) {
        Ok(fun) => state.fun = Some(fun),
        Err(err) => shell::report_parse_err(&mut out, &err)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn stopped_child_is_reaped() {
        let mut child = process::Command::new("sleep").arg("30").spawn().unwrap();
        stop_gnuplot(&mut child).unwrap();
        // a reaped child has an exit status ready immediately
        assert!(child.try_wait().unwrap().is_some());
    }

    #[test]
    fn output_names_are_timestamped() {
        let now = Local::now();
        let name = output_filename(now, "svg");
        assert!(name.starts_with("gradient_field_output-"));
        assert!(name.ends_with(".svg"));
        assert!(name.contains(&now.format("%Y-%m-%d_%H-%M-%S").to_string()));
    }
}
