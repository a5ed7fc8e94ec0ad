// SPDX: CC0-1.0

use crate::{GradientResult, Number, Point, SurfaceSample, Window};
use core::{fmt, str::FromStr};
use std::io::{self, Write};

pub const OUTPUT_RES: [u32; 2] = [1920, 1080];

/// Language of titles and legends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Language {
    #[default]
    English,
    Malay,
}

impl Language {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Malay => "ms",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Self::English),
            "ms" | "malay" | "bm" => Ok(Self::Malay),
            _ => Err("expected 'en' or 'ms'"),
        }
    }
}

pub struct Labels {
    pub title: &'static str,
    pub function: &'static str,
    pub surface: &'static str,
    pub gradient: &'static str,
    pub point: &'static str,
}

impl Language {
    pub const fn labels(&self) -> Labels {
        match self {
            Self::English => Labels {
                title: "Gradient and Direction of Steepest Ascent",
                function: "Function",
                surface: "Surface",
                gradient: "Gradient Direction",
                point: "Point",
            },
            Self::Malay => Labels {
                title: "Visualisasi Gradien",
                function: "Fungsi",
                surface: "Permukaan",
                gradient: "Arah Gradien",
                point: "Titik",
            },
        }
    }
}

/// Cosmetic settings for the rendered arrow and labels.
#[derive(Clone, Debug, PartialEq)]
pub struct Style {
    /// Multiplies the gradient before drawing it. Only there so the arrow
    /// fits the plot; the drawn length has no mathematical meaning.
    pub arrow_scale: Number,
    pub arrow_head: bool,
    pub language: Language,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            arrow_scale: 0.5,
            arrow_head: true,
            language: Language::English,
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Style")
            .field("arrow scale", &self.arrow_scale)
            .field("arrow head", &self.arrow_head)
            .field("language", &self.language.code())
            .finish()
    }
}

/// The gradient drawn as a segment at the height of the surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Arrow {
    pub tail: [Number; 3],
    pub tip: [Number; 3],
    pub head: bool,
}

impl Arrow {
    pub fn new(point: Point<Number>, grad: &GradientResult, style: &Style) -> Self {
        let s = style.arrow_scale;
        Self {
            tail: [point.x, point.y, grad.value],
            tip: [
                point.x + grad.gradient.x * s,
                point.y + grad.gradient.y * s,
                grad.value,
            ],
            head: style.arrow_head,
        }
    }
}

/// Grid as gnuplot scan lines: one `x y z` per line, a blank line between
/// rows.
pub fn write_data<W: Write>(mut out: W, sample: &SurfaceSample) -> io::Result<()> {
    for ((xs, ys), zs) in sample.xs.iter().zip(&sample.ys).zip(&sample.zs) {
        for ((x, y), z) in xs.iter().zip(ys).zip(zs) {
            writeln!(out, "{x} {y} {z}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub struct Script<'a> {
    pub data_path: &'a str,
    pub svg_path: &'a str,
    pub expr: &'a dyn fmt::Display,
    pub window: &'a Window,
    pub point: Point<Number>,
    pub grad: &'a GradientResult,
    pub style: &'a Style,
}

impl Script<'_> {
    pub fn write<W: Write>(&self, mut gnuplot: W) -> io::Result<()> {
        let labels = self.style.language.labels();

        writeln!(gnuplot, "reset")?;
        writeln!(gnuplot, "set term push")?;
        // set output info
        let [width, height] = OUTPUT_RES;
        writeln!(gnuplot, "set terminal svg size {width},{height} enhanced")?;
        writeln!(gnuplot, "set output '{}'", self.svg_path)?;

        // set window
        let win = self.window;
        writeln!(
            gnuplot,
            "set xrange[{min}:{max}]",
            min = win.x.start,
            max = win.x.end
        )?;
        writeln!(
            gnuplot,
            "set yrange[{min}:{max}]",
            min = win.y.start,
            max = win.y.end
        )?;
        writeln!(gnuplot, r#"set datafile missing "NaN""#)?;

        // configure appearence
        writeln!(
            gnuplot,
            r#"set title "{title}\n{function}: f(x, y) = {expr}\n{gradient}: ∇f({px}, {py}) = ⟨{gx:.2}, {gy:.2}⟩" noenhanced"#,
            title = labels.title,
            function = labels.function,
            gradient = labels.gradient,
            expr = self.expr,
            px = self.point.x,
            py = self.point.y,
            gx = self.grad.gradient.x,
            gy = self.grad.gradient.y,
        )?;
        writeln!(gnuplot, r#"set xlabel "x""#)?;
        writeln!(gnuplot, r#"set ylabel "y""#)?;
        writeln!(gnuplot, r#"set zlabel "f(x, y)""#)?;
        writeln!(gnuplot, "set tics out nomirror")?;
        writeln!(gnuplot, "set key out vertical top right")?;
        writeln!(gnuplot, "set view equal xy")?;
        writeln!(gnuplot, "set pm3d depthorder")?;
        writeln!(gnuplot, "set palette viridis")?;

        let arrow = Arrow::new(self.point, self.grad, self.style);
        let [tx, ty, tz] = arrow.tail;
        let [hx, hy, hz] = arrow.tip;
        writeln!(
            gnuplot,
            "set arrow 1 from {tx},{ty},{tz} to {hx},{hy},{hz} {head} lc rgb 'yellow' lw 4 front",
            head = if arrow.head { "head filled" } else { "nohead" },
        )?;

        writeln!(
            gnuplot,
            r#"set label 1 "{point}" at {tx},{ty},{tz} point pt 7 lc rgb 'yellow' offset 1,1 front noenhanced"#,
            point = labels.point,
        )?;

        // plot svg
        writeln!(gnuplot, r#"splot '{}' \"#, self.data_path)?;
        writeln!(
            gnuplot,
            r#"  using 1:2:3 with pm3d title "{surface}" noenhanced"#,
            surface = labels.surface,
        )?;

        // display window
        writeln!(gnuplot, "set term pop")?;
        writeln!(gnuplot, "replot")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::num::NonZeroU16;

    fn grad() -> GradientResult {
        GradientResult {
            value: 2.0,
            gradient: Point { x: 2.0, y: -4.0 },
        }
    }

    #[test]
    fn arrow_is_scaled_and_flat() {
        let style = Style {
            arrow_scale: 0.25,
            ..Style::default()
        };
        let arrow = Arrow::new(Point { x: 1.0, y: 1.0 }, &grad(), &style);
        assert_eq!(arrow.tail, [1.0, 1.0, 2.0]);
        assert_eq!(arrow.tip, [1.5, 0.0, 2.0]);
        assert!(arrow.head);
    }

    #[test]
    fn data_has_scan_lines() {
        let sample = SurfaceSample {
            xs: vec![vec![0.0, 1.0], vec![0.0, 1.0]],
            ys: vec![vec![5.0, 5.0], vec![6.0, 6.0]],
            zs: vec![vec![1.0, Number::NAN], vec![3.0, 4.0]],
        };
        let mut out = Vec::new();
        write_data(&mut out, &sample).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "0 5 1\n1 5 NaN\n\n0 6 3\n1 6 4\n\n"
        );
    }

    #[test]
    fn script_uses_style() {
        let window = Window {
            resolution: NonZeroU16::new(10).unwrap(),
            ..Window::default()
        };
        let style = Style {
            arrow_head: false,
            language: Language::Malay,
            ..Style::default()
        };
        let grad = grad();
        let script = Script {
            data_path: "out.data",
            svg_path: "out.svg",
            expr: &"x^2 + y^2",
            window: &window,
            point: Point { x: 1.0, y: 1.0 },
            grad: &grad,
            style: &style,
        };
        let mut out = Vec::new();
        script.write(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("set xrange[-5:5]"));
        assert!(text.contains("set arrow 1 from 1,1,2 to 2,-1,2 nohead"));
        assert!(text.contains("Fungsi: f(x, y) = x^2 + y^2"));
        assert!(text.contains("⟨2.00, -4.00⟩"));
        assert!(text.contains("splot 'out.data'"));
    }

    #[test]
    fn language_codes() {
        assert_eq!("MS".parse::<Language>(), Ok(Language::Malay));
        assert_eq!("en".parse::<Language>(), Ok(Language::English));
        assert!("fr".parse::<Language>().is_err());
    }
}
